// Keyguard — Enclave Module
//
// Key facility: tagged asymmetric keys used for encryption, decryption,
// signing and verification without exposing the private half. Keys can be
// bound to biometric authentication.

mod error;
mod provider;
mod software;

pub use error::EnclaveError;
pub use provider::{algorithm_matches, KeyAlgorithm, KeyFacility, KeyOperation, KeyRef, KeySpec};
pub use software::SoftwareKeyFacility;
