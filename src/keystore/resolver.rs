use std::sync::Arc;

use crate::crypto::Key;
use crate::keystore::Keystore;
use crate::utils::{KeystoreError, TxmError};

/// Resolves sender ids to signing keys, one lookup per use.
#[derive(Clone)]
pub struct KeyResolver {
    keystore: Arc<dyn Keystore>,
}

impl KeyResolver {
    pub fn new(keystore: Arc<dyn Keystore>) -> Self {
        Self { keystore }
    }

    pub fn resolve(&self, id: &str) -> Result<Key, TxmError> {
        self.keystore.get(id).map_err(|e| match e {
            KeystoreError::NotFound(id) => TxmError::KeyNotFound(id),
            other => TxmError::Keystore(other.to_string()),
        })
    }
}
