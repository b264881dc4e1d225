// Keyguard — Platform credential store capability
//
// Keyed put/get/delete with an attached access-control descriptor. A query
// can run with UI suppressed, in which case an item that would need
// interaction reports `InteractionNotAllowed` instead of prompting.

use zeroize::Zeroizing;

use super::access::{AccessControl, AuthContext};
use super::KeychainError;

/// Whether the keychain may present authentication UI while serving a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Allow,
    Fail,
}

/// A new generic-password item.
pub struct NewItem<'a> {
    pub key: &'a str,
    pub data: &'a [u8],
    pub access: AccessControl,
    /// Carries the application password for `AccessControl::ApplicationPassword`.
    pub context: Option<&'a AuthContext>,
}

/// Lookup of a single item.
#[derive(Debug)]
pub struct ItemQuery<'a> {
    pub key: &'a str,
    pub context: Option<&'a AuthContext>,
    pub ui: UiMode,
    /// Reason shown if the keychain prompts.
    pub prompt: Option<&'a str>,
    /// When false the item's data is not returned; only its status.
    pub return_data: bool,
}

impl<'a> ItemQuery<'a> {
    /// Status-only probe that never prompts.
    pub fn probe(key: &'a str) -> Self {
        Self {
            key,
            context: None,
            ui: UiMode::Fail,
            prompt: None,
            return_data: false,
        }
    }
}

/// Abstraction over the platform credential store, enabling the OS keyring
/// backend and an in-memory backend for tests.
pub trait PlatformKeychain: Send + Sync {
    /// Add an item. Fails with `DuplicateItem` if the key is taken.
    fn add(&self, item: NewItem<'_>) -> Result<(), KeychainError>;

    /// Add or overwrite an item. The new item's access control is sealed
    /// before anything is written; if sealing fails the existing item is
    /// left untouched.
    fn replace(&self, item: NewItem<'_>) -> Result<(), KeychainError>;

    /// Evaluate the item's access control and return its data.
    /// The returned buffer is empty when `return_data` is false.
    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError>;

    /// Delete an item. Fails with `ItemNotFound` if absent.
    fn delete(&self, key: &str) -> Result<(), KeychainError>;
}
