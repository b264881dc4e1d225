// Keyguard — Secret store data models
//
// SECURITY: passwords and secret bytes are wrapped in `Zeroizing` and never
// appear in Debug output. Secret bytes are reachable only through explicit
// accessors.

use std::fmt;

use zeroize::Zeroizing;

use crate::gate::PolicyKind;
use crate::platform::{AccessControl, AuthContext};

/// Authentication requirement attached to an entry.
pub enum AccessPolicy {
    /// Readable while the device is unlocked.
    DeviceUnlockOnly,
    /// Readable only with a matching password. The password goes to the
    /// platform keychain, which keeps a verifier, not the password.
    PasswordGated(Zeroizing<String>),
    /// Readable only after a biometric challenge; tied to the enrollment set
    /// at creation time.
    BiometryGated,
}

impl AccessPolicy {
    pub fn password(password: &str) -> Self {
        Self::PasswordGated(Zeroizing::new(password.to_string()))
    }

    pub(crate) fn access_control(&self) -> AccessControl {
        match self {
            Self::DeviceUnlockOnly => AccessControl::WhenUnlocked,
            Self::PasswordGated(_) => AccessControl::ApplicationPassword,
            Self::BiometryGated => AccessControl::BiometryCurrentSet,
        }
    }

    /// Context handed to the keychain when the entry is created.
    pub(crate) fn creation_context(&self) -> Option<AuthContext> {
        match self {
            Self::PasswordGated(pw) => Some(AuthContext::Password(pw.clone())),
            _ => None,
        }
    }

    /// The gate request matching this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::DeviceUnlockOnly => PolicyKind::DeviceUnlockOnly,
            Self::PasswordGated(pw) => PolicyKind::Password(pw.clone()),
            Self::BiometryGated => PolicyKind::Biometry,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeviceUnlockOnly => "device-unlock-only",
            Self::PasswordGated(_) => "password-gated",
            Self::BiometryGated => "biometry-gated",
        }
    }
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnlockOnly => write!(f, "DeviceUnlockOnly"),
            Self::PasswordGated(_) => write!(f, "PasswordGated([REDACTED])"),
            Self::BiometryGated => write!(f, "BiometryGated"),
        }
    }
}

/// Bytes released by a successful read. Zeroized on drop.
pub struct SecretBlob(Zeroizing<Vec<u8>>);

impl SecretBlob {
    pub(crate) fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// UTF-8 view of the secret, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Custom Debug implementation that NEVER reveals the secret.
impl fmt::Debug for SecretBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBlob([REDACTED; {} bytes])", self.0.len())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_blob_debug_redacts_contents() {
        let blob = SecretBlob::new(Zeroizing::new(b"Hello!".to_vec()));
        let debug = format!("{:?}", blob);
        assert!(debug.contains("[REDACTED"), "Debug output must be redacted");
        assert!(!debug.contains("Hello"), "Debug output must NEVER contain the secret");
    }

    #[test]
    fn test_secret_blob_accessors() {
        let blob = SecretBlob::new(Zeroizing::new(b"Hello!".to_vec()));
        assert_eq!(blob.as_bytes(), b"Hello!");
        assert_eq!(blob.to_string_lossy(), "Hello!");
        assert_eq!(blob.len(), 6);
    }

    #[test]
    fn test_policy_debug_redacts_password() {
        let policy = AccessPolicy::password("qwerty");
        assert!(!format!("{:?}", policy).contains("qwerty"));
    }

    #[test]
    fn test_policy_maps_to_access_control() {
        assert_eq!(
            AccessPolicy::DeviceUnlockOnly.access_control(),
            AccessControl::WhenUnlocked
        );
        assert_eq!(
            AccessPolicy::password("x").access_control(),
            AccessControl::ApplicationPassword
        );
        assert_eq!(
            AccessPolicy::BiometryGated.access_control(),
            AccessControl::BiometryCurrentSet
        );
        assert!(AccessPolicy::BiometryGated.creation_context().is_none());
        assert!(AccessPolicy::password("x").creation_context().is_some());
    }
}
