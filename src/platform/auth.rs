// Keyguard — Platform authentication subsystem
//
// The capability that evaluates an authentication policy against a
// human-readable reason and reports the health of biometric enrollment.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Biometric health, read fresh at every access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryAvailability {
    Available,
    /// Too many failed attempts; cleared by a device-owner challenge.
    TemporarilyLocked,
    /// Not enrolled or disabled.
    Unavailable,
}

impl fmt::Display for BiometryAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::TemporarilyLocked => write!(f, "locked (temporarily)"),
            Self::Unavailable => write!(f, "notAvailable (turned off/not enrolled)"),
        }
    }
}

/// The class of challenge to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Passcode-class challenge; also clears a biometric lockout.
    DeviceOwner,
    Biometrics,
    /// Inline prompt for an application password.
    ApplicationPassword,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Authentication was canceled by the user")]
    Canceled,

    #[error("Application retry limit exceeded")]
    Failed,

    #[error("Biometry is locked out")]
    Lockout,

    #[error("No identities are enrolled")]
    NotEnrolled,

    #[error("{0}")]
    Other(String),
}

/// Digest identifying the biometric enrollment set.
///
/// Two stamps compare equal only if no finger/face was added or removed in
/// between.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStamp(String);

impl EnrollmentStamp {
    pub fn from_domain_state(state: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"keyguard-enrollment::");
        hasher.update(state);
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Debug for EnrollmentStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnrollmentStamp({}…)", &self.0[..8.min(self.0.len())])
    }
}

/// Abstraction over the platform authentication subsystem.
///
/// `evaluate` and `prompt_password` may block on user interaction; callers on
/// the interaction context should go through `dispatch::run_blocking`.
pub trait AuthSubsystem: Send + Sync {
    /// Current biometric health. Cheap, no side effects.
    fn biometry_state(&self) -> BiometryAvailability;

    /// Stamp of the current enrollment set, `None` when nothing is enrolled.
    fn enrollment(&self) -> Option<EnrollmentStamp>;

    /// Present a challenge for `policy` with `reason` shown to the user.
    fn evaluate(&self, policy: AuthPolicy, reason: &str) -> Result<(), AuthFailure>;

    /// Ask the user to type an application password.
    fn prompt_password(&self, reason: &str) -> Result<String, AuthFailure>;
}
