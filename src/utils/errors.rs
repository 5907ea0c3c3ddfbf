use thiserror::Error;

use crate::txm::LifecycleState;

/// Errors surfaced synchronously by the transaction manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxmError {
    #[error("transaction manager has not been started")]
    NotStarted,

    #[error("transaction manager already started")]
    AlreadyStarted,

    #[error("transaction manager already stopped")]
    AlreadyStopped,

    #[error("transaction manager not ready (state: {0})")]
    NotReady(LifecycleState),

    #[error("cannot enqueue: transaction manager is not started")]
    ManagerNotStarted,

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Errors returned by a chain client capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("chain client unavailable: {0}")]
    Unavailable(String),

    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("invalid call: {0}")]
    InvalidCall(String),

    #[error("rejected by node: {0}")]
    Rejected(String),
}

impl ChainError {
    /// Transient errors are worth retrying within the timeout budget; everything
    /// else means the node has seen and refused the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transport(_) | ChainError::Timeout | ChainError::Unavailable(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    #[error("key does not exist: {0}")]
    NotFound(String),

    #[error("keystore backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, TxmError>;
