// Keyguard — In-memory keychain
//
// Process-local implementation of `PlatformKeychain`. Enforces the same
// access-control rules as the OS keyring backend but keeps everything in a
// mutex-guarded map. Used by tests and by the in-process demo flows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use zeroize::Zeroizing;

use super::access::{Guard, KdfParams};
use super::auth::AuthSubsystem;
use super::keychain::{ItemQuery, NewItem, PlatformKeychain};
use super::KeychainError;

#[derive(Clone)]
struct StoredItem {
    guard: Guard,
    data: Zeroizing<Vec<u8>>,
}

pub struct MemoryKeychain {
    items: Mutex<HashMap<String, StoredItem>>,
    auth: Arc<dyn AuthSubsystem>,
    kdf: KdfParams,
}

impl MemoryKeychain {
    pub fn new(auth: Arc<dyn AuthSubsystem>) -> Self {
        Self::with_kdf(auth, KdfParams::default())
    }

    pub fn with_kdf(auth: Arc<dyn AuthSubsystem>, kdf: KdfParams) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            auth,
            kdf,
        }
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        match self.items() {
            Ok(items) => items.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Keychain state unreadable, reporting empty");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, StoredItem>>, KeychainError> {
        self.items
            .lock()
            .map_err(|_| KeychainError::Backend("keychain state poisoned".to_string()))
    }
}

impl PlatformKeychain for MemoryKeychain {
    fn add(&self, item: NewItem<'_>) -> Result<(), KeychainError> {
        if item.key.is_empty() {
            return Err(KeychainError::Param("empty account key".to_string()));
        }
        // Seal before taking the lock; password derivation is slow.
        let guard = Guard::seal(item.access, item.context, self.auth.as_ref(), &self.kdf)?;

        let mut items = self.items()?;
        if items.contains_key(item.key) {
            return Err(KeychainError::DuplicateItem);
        }
        items.insert(
            item.key.to_string(),
            StoredItem {
                guard,
                data: Zeroizing::new(item.data.to_vec()),
            },
        );
        Ok(())
    }

    fn replace(&self, item: NewItem<'_>) -> Result<(), KeychainError> {
        if item.key.is_empty() {
            return Err(KeychainError::Param("empty account key".to_string()));
        }
        let guard = Guard::seal(item.access, item.context, self.auth.as_ref(), &self.kdf)?;

        self.items()?.insert(
            item.key.to_string(),
            StoredItem {
                guard,
                data: Zeroizing::new(item.data.to_vec()),
            },
        );
        Ok(())
    }

    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let stored = self
            .items()?
            .get(query.key)
            .cloned()
            .ok_or(KeychainError::ItemNotFound)?;

        // The lock is released here so a prompt never blocks other callers.
        stored.guard.check(query, self.auth.as_ref())?;

        if query.return_data {
            Ok(stored.data)
        } else {
            Ok(Zeroizing::new(Vec::new()))
        }
    }

    fn delete(&self, key: &str) -> Result<(), KeychainError> {
        self.items()?
            .remove(key)
            .map(|_| ())
            .ok_or(KeychainError::ItemNotFound)
    }
}
