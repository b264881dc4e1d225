// Keyguard — OS keyring keychain
//
// Production `PlatformKeychain` backed by the `keyring` crate, which
// dispatches to:
//   - macOS: Security.framework Keychain
//   - Windows: Windows Credential Manager
//   - Linux: kernel keyutils
//
// The native stores only hold opaque bytes, so each item is written as a
// JSON envelope carrying the sealed guard next to the base64 blob. Access
// control is evaluated here, on the way out.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::access::{Guard, KdfParams};
use super::auth::AuthSubsystem;
use super::keychain::{ItemQuery, NewItem, PlatformKeychain};
use super::KeychainError;

/// Service name used to identify Keyguard entries in the platform keyring.
pub const DEFAULT_KEYRING_SERVICE: &str = "keyguard-sample";

const ENVELOPE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u8,
    guard: Guard,
    blob: String,
    created_at: DateTime<Utc>,
}

pub struct KeyringKeychain {
    service: String,
    auth: Arc<dyn AuthSubsystem>,
    kdf: KdfParams,
}

impl KeyringKeychain {
    pub fn new(service: &str, auth: Arc<dyn AuthSubsystem>, kdf: KdfParams) -> Self {
        Self {
            service: service.to_string(),
            auth,
            kdf,
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, KeychainError> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| KeychainError::Backend(format!("failed to create keyring entry: {}", e)))
    }

    fn load(&self, key: &str) -> Result<Envelope, KeychainError> {
        let raw = match self.entry(key)?.get_secret() {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(keyring::Error::NoEntry) => return Err(KeychainError::ItemNotFound),
            Err(e) => {
                return Err(KeychainError::Backend(format!(
                    "failed to read keyring entry: {}",
                    e
                )))
            }
        };

        let envelope: Envelope = serde_json::from_slice(&raw)
            .map_err(|e| KeychainError::Backend(format!("malformed keyring envelope: {}", e)))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(KeychainError::Backend(format!(
                "unsupported envelope version: {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }

    /// Seal the item's guard and encode the envelope to write.
    fn seal(&self, item: &NewItem<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let guard = Guard::seal(item.access, item.context, self.auth.as_ref(), &self.kdf)?;
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            guard,
            blob: STANDARD.encode(item.data),
            created_at: Utc::now(),
        };
        serde_json::to_vec(&envelope)
            .map(Zeroizing::new)
            .map_err(|e| KeychainError::Backend(format!("failed to encode envelope: {}", e)))
    }
}

impl PlatformKeychain for KeyringKeychain {
    fn add(&self, item: NewItem<'_>) -> Result<(), KeychainError> {
        if item.key.is_empty() {
            return Err(KeychainError::Param("empty account key".to_string()));
        }
        let entry = self.entry(item.key)?;
        match entry.get_secret() {
            Ok(_) => return Err(KeychainError::DuplicateItem),
            Err(keyring::Error::NoEntry) => {}
            Err(e) => {
                return Err(KeychainError::Backend(format!(
                    "failed to check keyring entry: {}",
                    e
                )))
            }
        }

        let bytes = self.seal(&item)?;
        entry
            .set_secret(&bytes)
            .map_err(|e| KeychainError::Backend(format!("failed to store keyring entry: {}", e)))?;
        tracing::debug!(key = %item.key, "Keyring item stored");
        Ok(())
    }

    fn replace(&self, item: NewItem<'_>) -> Result<(), KeychainError> {
        if item.key.is_empty() {
            return Err(KeychainError::Param("empty account key".to_string()));
        }
        let bytes = self.seal(&item)?;
        self.entry(item.key)?
            .set_secret(&bytes)
            .map_err(|e| KeychainError::Backend(format!("failed to store keyring entry: {}", e)))?;
        tracing::debug!(key = %item.key, "Keyring item replaced");
        Ok(())
    }

    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let envelope = self.load(query.key)?;
        envelope.guard.check(query, self.auth.as_ref())?;

        if !query.return_data {
            return Ok(Zeroizing::new(Vec::new()));
        }
        let blob = Zeroizing::new(envelope.blob);
        STANDARD
            .decode(blob.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| KeychainError::Backend(format!("corrupted keyring blob: {}", e)))
    }

    fn delete(&self, key: &str) -> Result<(), KeychainError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(KeychainError::ItemNotFound),
            Err(e) => Err(KeychainError::Backend(format!(
                "failed to delete keyring entry: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trips_guard() {
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            guard: Guard::Open,
            blob: STANDARD.encode(b"Hello!"),
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_slice(&json).unwrap();
        assert!(matches!(parsed.guard, Guard::Open));
        assert_eq!(STANDARD.decode(parsed.blob).unwrap(), b"Hello!");
    }
}
