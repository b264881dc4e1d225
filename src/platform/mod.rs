// Keyguard — Platform Module
//
// Injected capabilities standing in for the ambient OS security services:
// the credential store (`PlatformKeychain`) and the authentication
// subsystem (`AuthSubsystem`). The gate and the store only ever talk to
// these traits.

mod access;
mod auth;
mod error;
mod keychain;
mod keyring_store;
mod memory;
mod simulated;

pub use access::{from_auth_failure, AccessControl, AuthContext, Guard, KdfParams, DEFAULT_PROMPT};
pub use auth::{AuthFailure, AuthPolicy, AuthSubsystem, BiometryAvailability, EnrollmentStamp};
pub use error::KeychainError;
pub use keychain::{ItemQuery, NewItem, PlatformKeychain, UiMode};
pub use keyring_store::{KeyringKeychain, DEFAULT_KEYRING_SERVICE};
pub use memory::MemoryKeychain;
pub use simulated::{SimulatedAuthenticator, MAX_FAILED_BIOMETRIC_ATTEMPTS};
