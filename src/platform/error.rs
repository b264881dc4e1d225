// Keyguard — Platform keychain status codes
//
// Every failure the platform credential store can report. Codes follow the
// OSStatus values of the native keychain so they can be surfaced verbatim.

use thiserror::Error;

pub const ERR_ITEM_NOT_FOUND: i32 = -25300;
pub const ERR_DUPLICATE_ITEM: i32 = -25299;
pub const ERR_AUTH_FAILED: i32 = -25293;
pub const ERR_INTERACTION_NOT_ALLOWED: i32 = -25308;
pub const ERR_USER_CANCELED: i32 = -128;
pub const ERR_NOT_AVAILABLE: i32 = -25291;
pub const ERR_PARAM: i32 = -50;
pub const ERR_INTERNAL_COMPONENT: i32 = -2070;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeychainError {
    #[error("The specified item could not be found in the keychain")]
    ItemNotFound,

    #[error("The specified item already exists in the keychain")]
    DuplicateItem,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("User interaction is required but not allowed")]
    InteractionNotAllowed,

    #[error("User canceled the operation")]
    UserCanceled,

    #[error("Authentication is not available on this device")]
    AuthUnavailable,

    #[error("Invalid parameter: {0}")]
    Param(String),

    #[error("Keychain backend error: {0}")]
    Backend(String),
}

impl KeychainError {
    /// The OSStatus-style code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            Self::ItemNotFound => ERR_ITEM_NOT_FOUND,
            Self::DuplicateItem => ERR_DUPLICATE_ITEM,
            Self::AuthFailed(_) => ERR_AUTH_FAILED,
            Self::InteractionNotAllowed => ERR_INTERACTION_NOT_ALLOWED,
            Self::UserCanceled => ERR_USER_CANCELED,
            Self::AuthUnavailable => ERR_NOT_AVAILABLE,
            Self::Param(_) => ERR_PARAM,
            Self::Backend(_) => ERR_INTERNAL_COMPONENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_native_status_values() {
        assert_eq!(KeychainError::ItemNotFound.code(), -25300);
        assert_eq!(KeychainError::InteractionNotAllowed.code(), -25308);
        assert_eq!(KeychainError::AuthFailed("x".into()).code(), -25293);
    }
}
