// Keyguard — Store error types

use thiserror::Error;

use crate::platform::KeychainError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entry not found")]
    NotFound,

    /// Wrong credential, cancellation, or biometric mismatch.
    #[error("Authentication declined: {0}")]
    AuthenticationDeclined(String),

    #[error("Authentication is not available (not enrolled or disabled)")]
    AuthenticationUnavailable,

    #[error("Authentication required but user interaction was suppressed")]
    InteractionSuppressed,

    #[error("Invalid entry key: {0}")]
    InvalidKey(String),

    #[error("Platform store error (osstatus={code}): {message}")]
    Platform { code: i32, message: String },
}

impl From<KeychainError> for StoreError {
    fn from(err: KeychainError) -> Self {
        match err {
            KeychainError::ItemNotFound => Self::NotFound,
            KeychainError::AuthFailed(reason) => Self::AuthenticationDeclined(reason),
            KeychainError::UserCanceled => {
                Self::AuthenticationDeclined("canceled by user".to_string())
            }
            KeychainError::AuthUnavailable => Self::AuthenticationUnavailable,
            KeychainError::InteractionNotAllowed => Self::InteractionSuppressed,
            other => Self::Platform {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}
