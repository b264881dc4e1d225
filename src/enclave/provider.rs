// Keyguard — Key Facility
//
// Tagged asymmetric keys whose private half never leaves the facility.
// Callers hold a `KeyRef` and ask the facility to encrypt, decrypt, sign,
// or verify on their behalf. A key generated with `requires_biometry`
// prompts for biometrics on every private-key operation, so those calls
// block and belong on a worker (`dispatch::run_blocking`).

use super::EnclaveError;

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// X25519 key agreement, HKDF-SHA256, AES-256-GCM.
    EciesX25519HkdfSha256AesGcm,
    /// Ed25519 over the full message.
    Ed25519Message,
    /// Ed25519 over a caller-computed 32-byte SHA-256 digest.
    Ed25519Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
}

/// Generation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeySpec {
    pub requires_biometry: bool,
}

/// Reference to a key held by a facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRef {
    tag: String,
    requires_biometry: bool,
}

impl KeyRef {
    pub(crate) fn new(tag: &str, requires_biometry: bool) -> Self {
        Self {
            tag: tag.to_string(),
            requires_biometry,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn requires_biometry(&self) -> bool {
        self.requires_biometry
    }
}

/// Whether `algorithm` is defined for `operation`.
pub fn algorithm_matches(operation: KeyOperation, algorithm: KeyAlgorithm) -> bool {
    matches!(
        (operation, algorithm),
        (
            KeyOperation::Encrypt | KeyOperation::Decrypt,
            KeyAlgorithm::EciesX25519HkdfSha256AesGcm
        ) | (
            KeyOperation::Sign | KeyOperation::Verify,
            KeyAlgorithm::Ed25519Message | KeyAlgorithm::Ed25519Digest
        )
    )
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a hardware-style key facility, enabling platform
/// backends and the in-process software implementation.
pub trait KeyFacility: Send + Sync {
    /// Look up an existing key by tag.
    fn load_key(&self, tag: &str) -> Result<Option<KeyRef>, EnclaveError>;

    /// Generate and persist a new key under `tag`.
    fn generate_key(&self, tag: &str, spec: KeySpec) -> Result<KeyRef, EnclaveError>;

    /// Delete the key. Deleting a missing key is not an error.
    fn delete_key(&self, tag: &str) -> Result<(), EnclaveError>;

    /// External representation of the public half.
    fn public_key(&self, key: &KeyRef) -> Result<Vec<u8>, EnclaveError>;

    fn is_algorithm_supported(
        &self,
        key: &KeyRef,
        operation: KeyOperation,
        algorithm: KeyAlgorithm,
    ) -> bool;

    /// Encrypt with the public half. Never prompts.
    fn encrypt(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EnclaveError>;

    /// Decrypt with the private half; may prompt with `reason`.
    fn decrypt(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        ciphertext: &[u8],
        reason: &str,
    ) -> Result<zeroize::Zeroizing<Vec<u8>>, EnclaveError>;

    /// Sign with the private half; may prompt with `reason`.
    fn sign(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        data: &[u8],
        reason: &str,
    ) -> Result<Vec<u8>, EnclaveError>;

    /// Verify with the public half. A malformed or wrong signature is `Ok(false)`.
    fn verify(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, EnclaveError>;
}
