// Keyguard — Enclave error types

use thiserror::Error;

use super::{KeyAlgorithm, KeyOperation};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnclaveError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    #[error("Algorithm {algorithm:?} not supported for {operation:?}")]
    UnsupportedAlgorithm {
        operation: KeyOperation,
        algorithm: KeyAlgorithm,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Biometry is not available; key cannot be used")]
    AuthenticationUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Key store error: {0}")]
    Backend(String),
}
