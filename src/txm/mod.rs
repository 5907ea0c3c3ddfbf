//! Transaction manager: per-account ordered broadcasting plus confirmation tracking.
//!
//! - queue: FIFO buffers keyed by sender, lazily owned by workers
//! - broadcaster: sign + submit with bounded retry, one worker per active sender
//! - confirmer: shared poll loop resolving confirmed / failed / timed-out
//! - manager: lifecycle (start / ready / close), enqueue, inflight counts

pub mod broadcaster;
pub mod config;
pub mod confirmer;
pub mod manager;
pub mod queue;
pub mod service_handle;
pub mod telemetry;
pub mod types;

pub use broadcaster::{BroadcastFailure, Broadcaster};
pub use config::{Config, TxmConfig};
pub use confirmer::{ConfirmationTracker, PollSummary};
pub use manager::Txm;
pub use queue::AccountQueues;
pub use service_handle::ServiceHandle;
pub use telemetry::Reporter;
pub use types::{InflightTx, LifecycleState, TxEvent, TxRequest};
