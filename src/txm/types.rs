use std::fmt;

use tokio::time::Instant;

use crate::chain::{Address, FunctionCall, TxHash};
use crate::crypto::KeyId;

/// A contract call waiting in a sender's queue.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub sender: KeyId,
    pub account: Address,
    pub call: FunctionCall,
    pub enqueued_at: Instant,
}

impl TxRequest {
    pub fn new(sender: impl Into<KeyId>, account: Address, call: FunctionCall) -> Self {
        Self { sender: sender.into(), account, call, enqueued_at: Instant::now() }
    }
}

/// A transaction the chain accepted and the tracker is watching.
#[derive(Debug, Clone)]
pub struct InflightTx {
    pub sender: KeyId,
    pub account: Address,
    pub nonce: u64,
    pub hash: TxHash,
    pub submitted_at: Instant,
}

/// Per-transaction notifications, emitted fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    Submitted { sender: KeyId, account: Address, nonce: u64, hash: TxHash },
    Confirmed { sender: KeyId, hash: TxHash },
    Failed { sender: KeyId, hash: TxHash, reason: String },
    TimedOut { sender: KeyId, hash: TxHash },
    /// Never broadcast: key missing, permanent rejection, or retry budget spent.
    Dropped { sender: KeyId, account: Address, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unstarted,
    Started,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unstarted => "unstarted",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
