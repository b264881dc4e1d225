// Keyguard — Top-level error types
//
// Aggregates errors from the store, enclave, platform, config and dispatch
// modules into a single error enum for the application boundary.

use thiserror::Error;

/// Top-level error type for all Keyguard operations.
#[derive(Debug, Error)]
pub enum KeyguardError {
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Enclave error: {0}")]
    Enclave(#[from] crate::enclave::EnclaveError),

    #[error("Keychain error: {0}")]
    Keychain(#[from] crate::platform::KeychainError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] crate::dispatch::DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KeyguardError>;
