// Keyguard — Software key facility
//
// In-process `KeyFacility`. Each key pairs an Ed25519 signing key with an
// X25519 agreement key; the public representation is the two 32-byte public
// halves concatenated (verifying key first).
//
// ECIES ciphertext layout:
//   ephemeral X25519 public (32) || AES-GCM nonce (12) || ciphertext + tag
// The AES-256 key is HKDF-SHA256(shared secret) with both public keys bound
// into the info string.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::platform::{AuthFailure, AuthPolicy, AuthSubsystem, EnrollmentStamp};

use super::provider::{algorithm_matches, KeyAlgorithm, KeyFacility, KeyOperation, KeyRef, KeySpec};
use super::EnclaveError;

const ECIES_INFO: &[u8] = b"keyguard-ecies-x25519-aes256gcm-v1";
const PUBLIC_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

struct KeyMaterial {
    signing: SigningKey,
    agreement: StaticSecret,
    /// Enrollment the key is bound to, for biometry-bound keys.
    enrollment: Option<EnrollmentStamp>,
}

pub struct SoftwareKeyFacility {
    keys: Mutex<HashMap<String, Arc<KeyMaterial>>>,
    auth: Arc<dyn AuthSubsystem>,
}

impl SoftwareKeyFacility {
    pub fn new(auth: Arc<dyn AuthSubsystem>) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            auth,
        }
    }

    fn keys(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<KeyMaterial>>>, EnclaveError> {
        self.keys
            .lock()
            .map_err(|_| EnclaveError::Backend("key store state poisoned".to_string()))
    }

    fn material(&self, key: &KeyRef) -> Result<Arc<KeyMaterial>, EnclaveError> {
        self.keys()?
            .get(key.tag())
            .cloned()
            .ok_or_else(|| EnclaveError::KeyNotFound(key.tag().to_string()))
    }

    fn ensure_supported(
        operation: KeyOperation,
        algorithm: KeyAlgorithm,
    ) -> Result<(), EnclaveError> {
        if algorithm_matches(operation, algorithm) {
            Ok(())
        } else {
            Err(EnclaveError::UnsupportedAlgorithm {
                operation,
                algorithm,
            })
        }
    }

    /// Gate a private-key operation on biometrics for biometry-bound keys.
    fn authenticate(&self, material: &KeyMaterial, reason: &str) -> Result<(), EnclaveError> {
        let Some(bound) = &material.enrollment else {
            return Ok(());
        };
        match self.auth.enrollment() {
            None => return Err(EnclaveError::AuthenticationUnavailable),
            Some(current) if current != *bound => {
                return Err(EnclaveError::Authentication(
                    "biometric enrollment changed; key must be regenerated".to_string(),
                ))
            }
            Some(_) => {}
        }
        self.auth
            .evaluate(AuthPolicy::Biometrics, reason)
            .map_err(|failure| match failure {
                AuthFailure::NotEnrolled => EnclaveError::AuthenticationUnavailable,
                other => EnclaveError::Authentication(other.to_string()),
            })
    }
}

fn random_seed() -> Zeroizing<[u8; 32]> {
    let mut seed = Zeroizing::new([0u8; 32]);
    rand::rng().fill_bytes(&mut *seed);
    seed
}

fn check_digest(algorithm: KeyAlgorithm, data: &[u8]) -> Result<(), EnclaveError> {
    if algorithm == KeyAlgorithm::Ed25519Digest && data.len() != DIGEST_LEN {
        return Err(EnclaveError::InvalidInput(format!(
            "digest must be {} bytes, got {}",
            DIGEST_LEN,
            data.len()
        )));
    }
    Ok(())
}

fn derive_cipher(
    shared: &[u8],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Aes256Gcm, EnclaveError> {
    let mut info = Vec::with_capacity(ECIES_INFO.len() + 2 * PUBLIC_LEN);
    info.extend_from_slice(ECIES_INFO);
    info.extend_from_slice(ephemeral.as_bytes());
    info.extend_from_slice(recipient.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(None, shared);
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(&info, &mut *key)
        .map_err(|e| EnclaveError::Crypto(format!("HKDF expand failed: {}", e)))?;

    Aes256Gcm::new_from_slice(&*key)
        .map_err(|e| EnclaveError::Crypto(format!("invalid AES key: {}", e)))
}

fn ecies_seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnclaveError> {
    let ephemeral = StaticSecret::from(*random_seed());
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);
    let cipher = derive_cipher(shared.as_bytes(), &ephemeral_public, recipient)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| EnclaveError::Crypto("encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(PUBLIC_LEN + NONCE_LEN + sealed.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn ecies_open(
    secret: &StaticSecret,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
    if ciphertext.len() < PUBLIC_LEN + NONCE_LEN + TAG_LEN {
        return Err(EnclaveError::InvalidInput(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }
    let (ephemeral_bytes, rest) = ciphertext.split_at(PUBLIC_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let mut ephemeral = [0u8; PUBLIC_LEN];
    ephemeral.copy_from_slice(ephemeral_bytes);
    let ephemeral_public = PublicKey::from(ephemeral);
    let recipient = PublicKey::from(secret);

    let shared = secret.diffie_hellman(&ephemeral_public);
    let cipher = derive_cipher(shared.as_bytes(), &ephemeral_public, &recipient)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map(Zeroizing::new)
        .map_err(|_| EnclaveError::Crypto("decryption failed".to_string()))
}

impl KeyFacility for SoftwareKeyFacility {
    fn load_key(&self, tag: &str) -> Result<Option<KeyRef>, EnclaveError> {
        Ok(self
            .keys()?
            .get(tag)
            .map(|material| KeyRef::new(tag, material.enrollment.is_some())))
    }

    fn generate_key(&self, tag: &str, spec: KeySpec) -> Result<KeyRef, EnclaveError> {
        if tag.is_empty() {
            return Err(EnclaveError::InvalidInput("key tag must not be empty".to_string()));
        }
        let enrollment = if spec.requires_biometry {
            Some(
                self.auth
                    .enrollment()
                    .ok_or(EnclaveError::AuthenticationUnavailable)?,
            )
        } else {
            None
        };

        let material = KeyMaterial {
            signing: SigningKey::from_bytes(&random_seed()),
            agreement: StaticSecret::from(*random_seed()),
            enrollment,
        };

        let mut keys = self.keys()?;
        if keys.contains_key(tag) {
            return Err(EnclaveError::DuplicateKey(tag.to_string()));
        }
        keys.insert(tag.to_string(), Arc::new(material));

        tracing::info!(tag, requires_biometry = spec.requires_biometry, "Key generated");
        Ok(KeyRef::new(tag, spec.requires_biometry))
    }

    fn delete_key(&self, tag: &str) -> Result<(), EnclaveError> {
        if self.keys()?.remove(tag).is_some() {
            tracing::info!(tag, "Key deleted");
        } else {
            tracing::debug!(tag, "No key to delete");
        }
        Ok(())
    }

    fn public_key(&self, key: &KeyRef) -> Result<Vec<u8>, EnclaveError> {
        let material = self.material(key)?;
        let mut out = Vec::with_capacity(2 * PUBLIC_LEN);
        out.extend_from_slice(material.signing.verifying_key().as_bytes());
        out.extend_from_slice(PublicKey::from(&material.agreement).as_bytes());
        Ok(out)
    }

    fn is_algorithm_supported(
        &self,
        key: &KeyRef,
        operation: KeyOperation,
        algorithm: KeyAlgorithm,
    ) -> bool {
        self.material(key).is_ok() && algorithm_matches(operation, algorithm)
    }

    fn encrypt(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, EnclaveError> {
        Self::ensure_supported(KeyOperation::Encrypt, algorithm)?;
        let material = self.material(key)?;
        ecies_seal(&PublicKey::from(&material.agreement), plaintext)
    }

    fn decrypt(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        ciphertext: &[u8],
        reason: &str,
    ) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
        Self::ensure_supported(KeyOperation::Decrypt, algorithm)?;
        let material = self.material(key)?;
        self.authenticate(&material, reason)?;
        ecies_open(&material.agreement, ciphertext)
    }

    fn sign(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        data: &[u8],
        reason: &str,
    ) -> Result<Vec<u8>, EnclaveError> {
        Self::ensure_supported(KeyOperation::Sign, algorithm)?;
        check_digest(algorithm, data)?;
        let material = self.material(key)?;
        self.authenticate(&material, reason)?;
        Ok(material.signing.sign(data).to_bytes().to_vec())
    }

    fn verify(
        &self,
        key: &KeyRef,
        algorithm: KeyAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, EnclaveError> {
        Self::ensure_supported(KeyOperation::Verify, algorithm)?;
        check_digest(algorithm, data)?;
        let material = self.material(key)?;

        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(material
            .signing
            .verifying_key()
            .verify(data, &signature)
            .is_ok())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
