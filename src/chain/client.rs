use std::sync::Arc;

use crate::chain::types::{Address, SignedTransaction, TxHash, TxStatus};
use crate::utils::ChainError;

/// Chain client capability. Implementations must be safe to share across tasks;
/// the manager never serializes access beyond per-account ordering.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Network identifier, bound into every signed payload.
    async fn chain_id(&self) -> Result<String, ChainError>;

    /// Next nonce for `account`, counting transactions the node has accepted but
    /// not yet finalized.
    async fn account_nonce(&self, account: &Address) -> Result<u64, ChainError>;

    async fn submit_transaction(&self, tx: SignedTransaction) -> Result<TxHash, ChainError>;

    async fn transaction_status(&self, hash: &TxHash) -> Result<TxStatus, ChainError>;
}

/// Returns the current chain client. Called whenever a client is needed so the
/// host can reconnect or swap clients underneath a running manager.
pub type ClientAccessor = Arc<dyn Fn() -> Result<Arc<dyn ChainClient>, ChainError> + Send + Sync>;

/// Accessor that always hands out the same client.
pub fn static_accessor(client: Arc<dyn ChainClient>) -> ClientAccessor {
    Arc::new(move || Ok(client.clone()))
}
