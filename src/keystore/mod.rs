//! Keystore capability and the manager's resolver over it.

pub mod resolver;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::crypto::Key;
use crate::utils::KeystoreError;

pub use resolver::KeyResolver;

/// Maps key identifiers to signing keys. The keystore is the source of truth;
/// callers must not cache what it returns.
pub trait Keystore: Send + Sync + 'static {
    fn get(&self, id: &str) -> Result<Key, KeystoreError>;
}

/// Keystore held in process memory (tests, devnets).
#[derive(Default)]
pub struct InMemoryKeystore {
    keys: RwLock<HashMap<String, Key>>,
}

impl InMemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` under its own id, returning the id.
    pub fn insert(&self, key: Key) -> String {
        let id = key.id();
        self.keys.write().insert(id.clone(), key);
        id
    }

    pub fn remove(&self, id: &str) -> Option<Key> {
        self.keys.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl Keystore for InMemoryKeystore {
    fn get(&self, id: &str) -> Result<Key, KeystoreError> {
        self.keys.read().get(id).cloned().ok_or_else(|| KeystoreError::NotFound(id.to_string()))
    }
}
