// Keyguard — Store Module
//
// Policy-tagged secret storage. Every entry carries an access policy that
// the platform keychain enforces on read.

mod error;
mod models;
mod repository;

pub use error::StoreError;
pub use models::{AccessPolicy, SecretBlob};
pub use repository::{CredentialStore, KeychainCredentialStore, DEFAULT_HANDLE_TTL};
