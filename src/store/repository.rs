// Keyguard — Credential Store Repository
//
// Policy-tagged secret storage over a platform keychain.
// Key design decisions:
//   - `store()` is last-write-wins: a successful store replaces any prior
//     entry; a rejected one leaves it in place.
//   - `read()` never prompts. With a handle the handle's context is used;
//     without one a gated entry reports `InteractionSuppressed`.
//   - `read_with_prompt()` lets the keychain present its own challenge.
//   - `exists()` probes with UI suppressed; "found" and "found, needs
//     interaction" both count as existing.

use std::sync::Arc;
use std::time::Duration;

use crate::gate::AuthorizationHandle;
use crate::platform::{ItemQuery, KeychainError, NewItem, PlatformKeychain, UiMode};

use super::models::{AccessPolicy, SecretBlob};
use super::StoreError;

/// Default lifetime of an authorization handle.
pub const DEFAULT_HANDLE_TTL: Duration = Duration::from_secs(30);

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over policy-gated secret storage.
pub trait CredentialStore: Send + Sync {
    /// Replace whatever is stored under `key` with `blob`, tagged with `policy`.
    /// If the new entry is rejected the prior one is kept.
    fn store(&self, key: &str, blob: &[u8], policy: &AccessPolicy) -> Result<(), StoreError>;

    /// Delete the entry if present. Absence is not an error.
    fn remove(&self, key: &str);

    /// Whether an entry exists, answered without any interaction.
    ///
    /// An entry that needs authentication still counts as existing. Backend
    /// failures (unreadable or corrupted items) are logged and reported as
    /// `false`, the same as a missing entry.
    fn exists(&self, key: &str) -> bool;

    /// Read the entry, consuming `authorization` if given. Never prompts.
    fn read(
        &self,
        key: &str,
        authorization: Option<AuthorizationHandle>,
    ) -> Result<SecretBlob, StoreError>;

    /// Read the entry, letting the platform prompt inline with `reason`.
    fn read_with_prompt(&self, key: &str, reason: &str) -> Result<SecretBlob, StoreError>;
}

// ─── Keychain Implementation ─────────────────────────────────────────────────

pub struct KeychainCredentialStore {
    keychain: Arc<dyn PlatformKeychain>,
    handle_ttl: Duration,
}

impl KeychainCredentialStore {
    pub fn new(keychain: Arc<dyn PlatformKeychain>) -> Self {
        Self::with_handle_ttl(keychain, DEFAULT_HANDLE_TTL)
    }

    pub fn with_handle_ttl(keychain: Arc<dyn PlatformKeychain>, handle_ttl: Duration) -> Self {
        Self {
            keychain,
            handle_ttl,
        }
    }

    fn validate_key(key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".to_string()));
        }
        Ok(())
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn store(&self, key: &str, blob: &[u8], policy: &AccessPolicy) -> Result<(), StoreError> {
        Self::validate_key(key)?;

        let context = policy.creation_context();
        self.keychain
            .replace(NewItem {
                key,
                data: blob,
                access: policy.access_control(),
                context: context.as_ref(),
            })
            .map_err(|e| {
                tracing::warn!(key = %key, policy = policy.label(), error = %e, "Entry creation failed");
                StoreError::from(e)
            })?;

        tracing::info!(key = %key, policy = policy.label(), "Entry stored");
        Ok(())
    }

    fn remove(&self, key: &str) {
        match self.keychain.delete(key) {
            Ok(()) => tracing::info!(key = %key, "Entry removed"),
            Err(KeychainError::ItemNotFound) => tracing::debug!(key = %key, "No entry to remove"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Entry removal failed"),
        }
    }

    fn exists(&self, key: &str) -> bool {
        match self.keychain.copy_matching(&ItemQuery::probe(key)) {
            Ok(_) | Err(KeychainError::InteractionNotAllowed) => true,
            Err(KeychainError::ItemNotFound) => false,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Existence probe failed");
                false
            }
        }
    }

    fn read(
        &self,
        key: &str,
        authorization: Option<AuthorizationHandle>,
    ) -> Result<SecretBlob, StoreError> {
        Self::validate_key(key)?;

        let context = match authorization {
            Some(handle) if handle.is_expired(self.handle_ttl) => {
                tracing::info!(key = %key, handle_id = %handle.id(), "Authorization expired");
                return Err(StoreError::AuthenticationDeclined(
                    "authorization expired".to_string(),
                ));
            }
            Some(handle) => Some(handle.into_context()),
            None => None,
        };

        // UI stays suppressed: with a handle the caller already authenticated,
        // without one the caller asked for a silent read.
        let query = ItemQuery {
            key,
            context: context.as_ref(),
            ui: UiMode::Fail,
            prompt: None,
            return_data: true,
        };

        let data = self.keychain.copy_matching(&query).map_err(|e| {
            tracing::info!(key = %key, error = %e, "Entry read failed");
            StoreError::from(e)
        })?;
        tracing::debug!(key = %key, "Entry read");
        Ok(SecretBlob::new(data))
    }

    fn read_with_prompt(&self, key: &str, reason: &str) -> Result<SecretBlob, StoreError> {
        Self::validate_key(key)?;

        let query = ItemQuery {
            key,
            context: None,
            ui: UiMode::Allow,
            prompt: Some(reason),
            return_data: true,
        };
        let data = self.keychain.copy_matching(&query).map_err(|e| {
            tracing::info!(key = %key, error = %e, "Entry read failed");
            StoreError::from(e)
        })?;
        tracing::debug!(key = %key, "Entry read after inline prompt");
        Ok(SecretBlob::new(data))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{AuthenticationGate, AuthorizationOutcome, PolicyKind};
    use crate::platform::{
        AuthFailure, AuthPolicy, BiometryAvailability, KdfParams, MemoryKeychain,
        SimulatedAuthenticator,
    };
    use zeroize::Zeroizing;

    struct Fixture {
        auth: Arc<SimulatedAuthenticator>,
        gate: AuthenticationGate,
        store: KeychainCredentialStore,
    }

    fn setup() -> Fixture {
        let auth = Arc::new(SimulatedAuthenticator::new());
        let keychain = Arc::new(MemoryKeychain::with_kdf(
            auth.clone(),
            KdfParams {
                m_cost: 8,
                t_cost: 1,
                p_cost: 1,
            },
        ));
        Fixture {
            gate: AuthenticationGate::new(auth.clone()),
            store: KeychainCredentialStore::new(keychain),
            auth,
        }
    }

    fn password(pw: &str) -> PolicyKind {
        PolicyKind::Password(Zeroizing::new(pw.to_string()))
    }

    #[test]
    fn test_store_then_read_returns_blob() {
        let f = setup();
        f.store
            .store("k1", b"Hello!", &AccessPolicy::DeviceUnlockOnly)
            .unwrap();

        let blob = f.store.read("k1", None).unwrap();
        assert_eq!(blob.to_string_lossy(), "Hello!");
    }

    #[test]
    fn test_store_is_last_write_wins() {
        let f = setup();
        f.store.store("k", b"first", &AccessPolicy::DeviceUnlockOnly).unwrap();
        f.store.store("k", b"second", &AccessPolicy::DeviceUnlockOnly).unwrap();

        let blob = f.store.read("k", None).unwrap();
        assert_eq!(blob.as_bytes(), b"second", "Overwrite must never return the old blob");
    }

    #[test]
    fn test_overwrite_can_change_policy() {
        let f = setup();
        f.store.store("k", b"open", &AccessPolicy::DeviceUnlockOnly).unwrap();
        f.store.store("k", b"gated", &AccessPolicy::BiometryGated).unwrap();

        assert_eq!(f.store.read("k", None).unwrap_err(), StoreError::InteractionSuppressed);
    }

    #[test]
    fn test_remove_then_exists_is_false() {
        let f = setup();
        f.store.store("k", b"x", &AccessPolicy::DeviceUnlockOnly).unwrap();
        assert!(f.store.exists("k"));

        f.store.remove("k");
        assert!(!f.store.exists("k"));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let f = setup();
        f.store.remove("never-stored");
        assert!(!f.store.exists("never-stored"));
    }

    #[test]
    fn test_exists_for_gated_entries_without_prompting() {
        let f = setup();
        f.store.store("bio", b"x", &AccessPolicy::BiometryGated).unwrap();
        f.store.store("pw", b"y", &AccessPolicy::password("pw1")).unwrap();

        assert!(f.store.exists("bio"), "Entry needing interaction still exists");
        assert!(f.store.exists("pw"), "Entry needing interaction still exists");
        assert!(f.auth.prompts().is_empty(), "exists() must never prompt");
    }

    #[test]
    fn test_read_with_valid_authorization_returns_blob() {
        let f = setup();
        f.store.store("bio", b"Hello!", &AccessPolicy::BiometryGated).unwrap();

        let handle = f
            .gate
            .authorize(PolicyKind::Biometry, "Access sample keychain entry")
            .into_handle()
            .unwrap();
        let blob = f.store.read("bio", Some(handle)).unwrap();
        assert_eq!(blob.as_bytes(), b"Hello!");
        assert_eq!(f.auth.prompts(), vec![AuthPolicy::Biometrics], "Exactly one prompt");
    }

    #[test]
    fn test_password_gated_with_wrong_password_is_declined() {
        let f = setup();
        f.store.store("k3", b"Hello!", &AccessPolicy::password("pw1")).unwrap();

        let handle = f.gate.authorize(password("wrong"), "x").into_handle().unwrap();
        let err = f.store.read("k3", Some(handle)).unwrap_err();
        assert!(
            matches!(err, StoreError::AuthenticationDeclined(_)),
            "Wrong password must be declined, got {:?}",
            err
        );
    }

    #[test]
    fn test_password_gated_with_correct_password() {
        let f = setup();
        f.store.store("k3", b"Hello!", &AccessPolicy::password("pw1")).unwrap();

        let handle = f.gate.authorize(password("pw1"), "x").into_handle().unwrap();
        assert_eq!(f.store.read("k3", Some(handle)).unwrap().as_bytes(), b"Hello!");
    }

    #[test]
    fn test_password_gated_without_password_is_suppressed() {
        let f = setup();
        f.store.store("k3", b"Hello!", &AccessPolicy::password("pw1")).unwrap();
        assert_eq!(f.store.read("k3", None).unwrap_err(), StoreError::InteractionSuppressed);
    }

    #[test]
    fn test_password_gated_rejects_unlock_only_handle() {
        let f = setup();
        f.store.store("k3", b"Hello!", &AccessPolicy::password("pw1")).unwrap();
        let handle = f
            .gate
            .authorize(PolicyKind::DeviceUnlockOnly, "x")
            .into_handle()
            .unwrap();
        assert!(matches!(
            f.store.read("k3", Some(handle)),
            Err(StoreError::AuthenticationDeclined(_))
        ));
    }

    #[test]
    fn test_empty_password_policy_is_rejected_at_store() {
        let f = setup();
        let err = f.store.store("k", b"x", &AccessPolicy::password("")).unwrap_err();
        assert!(matches!(err, StoreError::Platform { code: -50, .. }));
        assert!(!f.store.exists("k"));
    }

    #[test]
    fn test_failed_store_keeps_prior_entry() {
        let f = setup();
        f.store.store("k", b"old", &AccessPolicy::DeviceUnlockOnly).unwrap();

        let err = f.store.store("k", b"new", &AccessPolicy::password("")).unwrap_err();
        assert!(matches!(err, StoreError::Platform { code: -50, .. }));
        assert_eq!(
            f.store.read("k", None).unwrap().as_bytes(),
            b"old",
            "A rejected store must not destroy the prior entry"
        );

        f.auth.set_availability(BiometryAvailability::Unavailable);
        assert_eq!(
            f.store.store("k", b"new", &AccessPolicy::BiometryGated).unwrap_err(),
            StoreError::AuthenticationUnavailable
        );
        assert_eq!(f.store.read("k", None).unwrap().as_bytes(), b"old");
    }

    struct CorruptKeychain;

    impl PlatformKeychain for CorruptKeychain {
        fn add(&self, _item: NewItem<'_>) -> Result<(), KeychainError> {
            Err(KeychainError::Backend("corrupted".to_string()))
        }

        fn replace(&self, _item: NewItem<'_>) -> Result<(), KeychainError> {
            Err(KeychainError::Backend("corrupted".to_string()))
        }

        fn copy_matching(&self, _query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
            Err(KeychainError::Backend("malformed keyring envelope".to_string()))
        }

        fn delete(&self, _key: &str) -> Result<(), KeychainError> {
            Err(KeychainError::Backend("corrupted".to_string()))
        }
    }

    #[test]
    fn test_exists_reports_backend_failure_as_absent() {
        let store = KeychainCredentialStore::new(Arc::new(CorruptKeychain));
        assert!(!store.exists("k"));
        assert!(matches!(
            store.read("k", None),
            Err(StoreError::Platform { .. })
        ));
    }

    #[test]
    fn test_biometry_unavailable_scenario() {
        let f = setup();
        f.store.store("k2", b"Hello!", &AccessPolicy::BiometryGated).unwrap();
        f.auth.set_availability(BiometryAvailability::Unavailable);

        let outcome = f.gate.authorize(PolicyKind::Biometry, "Access sample keychain entry");
        assert!(matches!(outcome, AuthorizationOutcome::Unavailable));

        let err = f.store.read("k2", None).unwrap_err();
        assert!(
            matches!(err, StoreError::InteractionSuppressed | StoreError::NotFound),
            "Must never release the blob, got {:?}",
            err
        );
        assert!(f.auth.prompts().is_empty());
    }

    #[test]
    fn test_read_with_prompt_presents_one_biometric_prompt() {
        let f = setup();
        f.store.store("bio", b"Hello!", &AccessPolicy::BiometryGated).unwrap();

        let blob = f.store.read_with_prompt("bio", "Access sample keychain entry").unwrap();
        assert_eq!(blob.as_bytes(), b"Hello!");
        assert_eq!(f.auth.prompts(), vec![AuthPolicy::Biometrics]);
    }

    #[test]
    fn test_read_with_prompt_cancel_is_declined() {
        let f = setup();
        f.store.store("bio", b"Hello!", &AccessPolicy::BiometryGated).unwrap();
        f.auth.set_biometric_reply(Err(AuthFailure::Canceled));

        assert!(matches!(
            f.store.read_with_prompt("bio", "x"),
            Err(StoreError::AuthenticationDeclined(_))
        ));
    }

    #[test]
    fn test_read_with_prompt_asks_for_password() {
        let f = setup();
        f.store.store("pw", b"Hello!", &AccessPolicy::password("qwerty")).unwrap();
        f.auth.set_password_reply(Ok("qwerty".to_string()));

        let blob = f.store.read_with_prompt("pw", "Enter password").unwrap();
        assert_eq!(blob.as_bytes(), b"Hello!");
        assert_eq!(f.auth.prompts(), vec![AuthPolicy::ApplicationPassword]);
    }

    #[test]
    fn test_biometry_entry_invalidated_by_re_enrollment() {
        let f = setup();
        f.store.store("bio", b"Hello!", &AccessPolicy::BiometryGated).unwrap();
        f.auth.re_enroll();

        let handle = f.gate.authorize(PolicyKind::Biometry, "x").into_handle().unwrap();
        assert!(matches!(
            f.store.read("bio", Some(handle)),
            Err(StoreError::AuthenticationDeclined(_))
        ));

        // Recreating the entry binds it to the new enrollment.
        f.store.store("bio", b"Hello!", &AccessPolicy::BiometryGated).unwrap();
        let handle = f.gate.authorize(PolicyKind::Biometry, "x").into_handle().unwrap();
        assert!(f.store.read("bio", Some(handle)).is_ok());
    }

    #[test]
    fn test_expired_handle_is_declined() {
        let f = setup();
        let keychain = Arc::new(MemoryKeychain::new(f.auth.clone()));
        let store = KeychainCredentialStore::with_handle_ttl(keychain, Duration::ZERO);
        store.store("bio", b"x", &AccessPolicy::BiometryGated).unwrap();

        let handle = f.gate.authorize(PolicyKind::Biometry, "x").into_handle().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            store.read("bio", Some(handle)).unwrap_err(),
            StoreError::AuthenticationDeclined("authorization expired".to_string())
        );
    }

    #[test]
    fn test_read_missing_entry_is_not_found() {
        let f = setup();
        assert_eq!(f.store.read("missing", None).unwrap_err(), StoreError::NotFound);
    }

    #[test]
    fn test_empty_key_is_invalid() {
        let f = setup();
        assert!(matches!(
            f.store.store("", b"x", &AccessPolicy::DeviceUnlockOnly),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
