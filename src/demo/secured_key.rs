// Keyguard — Secured key demo
//
// Holds at most one prepared key plus the last ciphertext and signature.
// Toggling biometry switches to the other key tag and drops all of it.
// Failed operations leave the previous ciphertext/signature in place.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::dispatch::run_blocking;
use crate::enclave::{EnclaveError, KeyAlgorithm, KeyFacility, KeyOperation, KeyRef, KeySpec};

use super::hex_label;

pub const KEY_TAG: &str = "keychain-sample.sampleKey";
pub const KEY_TAG_BIO: &str = "keychain-sample.sampleKeyBio";
pub const CLEAR_TEXT: &str = "Hello";

const KEY_REASON: &str = "Use sample key";
const ENCRYPTION: KeyAlgorithm = KeyAlgorithm::EciesX25519HkdfSha256AesGcm;

pub struct SecuredKeyDemo {
    keys: Arc<dyn KeyFacility>,
    use_biometry: bool,
    key: Option<KeyRef>,
    ciphertext: Option<Vec<u8>>,
    signature: Option<(KeyAlgorithm, Vec<u8>)>,
}

impl SecuredKeyDemo {
    pub fn new(keys: Arc<dyn KeyFacility>) -> Self {
        Self {
            keys,
            use_biometry: false,
            key: None,
            ciphertext: None,
            signature: None,
        }
    }

    pub fn use_biometry(&self) -> bool {
        self.use_biometry
    }

    pub fn set_use_biometry(&mut self, on: bool) {
        self.use_biometry = on;
        self.key = None;
        self.ciphertext = None;
        self.signature = None;
    }

    pub fn key_tag(&self) -> &'static str {
        if self.use_biometry {
            KEY_TAG_BIO
        } else {
            KEY_TAG
        }
    }

    pub fn clear_text_label(&self) -> String {
        format!("Clear Text: {}", CLEAR_TEXT)
    }

    pub fn public_key_label(&self) -> String {
        let Some(key) = &self.key else {
            return "Public Key: none".to_string();
        };
        match self.keys.public_key(key) {
            Ok(bytes) => format!("Public Key: {}", hex_label(&bytes)),
            Err(e) => {
                tracing::warn!(tag = key.tag(), error = %e, "Public key unavailable");
                "Public Key: none".to_string()
            }
        }
    }

    /// Reuse the prepared key, else load it, else generate it.
    fn prepare_key(&mut self) -> Result<KeyRef, EnclaveError> {
        if let Some(key) = &self.key {
            return Ok(key.clone());
        }
        let tag = self.key_tag();
        let key = match self.keys.load_key(tag)? {
            Some(key) => key,
            None => self.keys.generate_key(
                tag,
                KeySpec {
                    requires_biometry: self.use_biometry,
                },
            )?,
        };
        self.key = Some(key.clone());
        Ok(key)
    }

    /// Public-key operation; never prompts.
    pub fn encrypt(&mut self) -> String {
        let key = match self.prepare_key() {
            Ok(key) => key,
            Err(e) => return format!("Can't create key: {}", e),
        };
        if !self
            .keys
            .is_algorithm_supported(&key, KeyOperation::Encrypt, ENCRYPTION)
        {
            return "Can't encrypt: Algorithm not supported".to_string();
        }
        match self.keys.encrypt(&key, ENCRYPTION, CLEAR_TEXT.as_bytes()) {
            Ok(ciphertext) => {
                let label = format!("Cipher Text: {}", hex_label(&ciphertext));
                self.ciphertext = Some(ciphertext);
                label
            }
            Err(e) => format!("Can't encrypt: {}", e),
        }
    }

    pub async fn decrypt(&mut self) -> String {
        let key = match self.prepare_key() {
            Ok(key) => key,
            Err(e) => return format!("Can't create key: {}", e),
        };
        let Some(ciphertext) = self.ciphertext.clone() else {
            return "Can't decrypt: No encrypted data, tap \"Encrypt\" first".to_string();
        };
        if !self
            .keys
            .is_algorithm_supported(&key, KeyOperation::Decrypt, ENCRYPTION)
        {
            return "Can't decrypt: Algorithm not supported".to_string();
        }

        let keys = self.keys.clone();
        let result = run_blocking("key.decrypt", move || {
            keys.decrypt(&key, ENCRYPTION, &ciphertext, KEY_REASON)
        })
        .await;

        match result {
            Ok(Ok(clear)) => format!(
                "Clear Text (decrypted): {}",
                String::from_utf8_lossy(&clear)
            ),
            Ok(Err(e)) => format!("Can't decrypt: {}", e),
            Err(e) => format!("Can't decrypt: {}", e),
        }
    }

    pub async fn sign_message(&mut self) -> String {
        self.sign(KeyAlgorithm::Ed25519Message).await
    }

    pub async fn sign_digest(&mut self) -> String {
        self.sign(KeyAlgorithm::Ed25519Digest).await
    }

    async fn sign(&mut self, algorithm: KeyAlgorithm) -> String {
        let key = match self.prepare_key() {
            Ok(key) => key,
            Err(e) => return format!("Can't create key: {}", e),
        };
        if !self
            .keys
            .is_algorithm_supported(&key, KeyOperation::Sign, algorithm)
        {
            return "Can't sign: Algorithm not supported".to_string();
        }

        let keys = self.keys.clone();
        let data = signed_data(algorithm);
        let result = run_blocking("key.sign", move || {
            keys.sign(&key, algorithm, &data, KEY_REASON)
        })
        .await;

        match result {
            Ok(Ok(signature)) => {
                let label = format!("Signature: {}", hex_label(&signature));
                self.signature = Some((algorithm, signature));
                label
            }
            Ok(Err(e)) => format!("Can't sign: {}", e),
            Err(e) => format!("Can't sign: {}", e),
        }
    }

    /// Verify the last signature against the data it was made over.
    pub fn verify(&mut self) -> String {
        let key = match self.prepare_key() {
            Ok(key) => key,
            Err(e) => return format!("Can't create key: {}", e),
        };
        let Some((algorithm, signature)) = &self.signature else {
            return "Can't verify signature: Calculate signature first!".to_string();
        };
        let data = signed_data(*algorithm);
        match self.keys.verify(&key, *algorithm, &data, signature) {
            Ok(true) => "Signature check: OK".to_string(),
            Ok(false) => "Signature check: Wrong!".to_string(),
            Err(e) => format!("Can't verify signature: {}", e),
        }
    }
}

fn signed_data(algorithm: KeyAlgorithm) -> Vec<u8> {
    match algorithm {
        KeyAlgorithm::Ed25519Digest => Sha256::digest(CLEAR_TEXT.as_bytes()).to_vec(),
        _ => CLEAR_TEXT.as_bytes().to_vec(),
    }
}
