use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::chain::Address;
use crate::txm::types::{InflightTx, TxEvent, TxRequest};
use crate::utils::metrics::{self, MetricsRegistry};
use crate::utils::ChainError;

const EVENT_CAPACITY: usize = 1024;

/// Logs, counts and publishes every submission and terminal outcome.
#[derive(Clone)]
pub struct Reporter {
    metrics: MetricsRegistry,
    events: broadcast::Sender<TxEvent>,
}

impl Reporter {
    pub fn new(metrics: MetricsRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { metrics, events }
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: TxEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn enqueued(&self, req: &TxRequest) {
        self.metrics.inc_counter(metrics::ENQUEUED);
        debug!(sender = %req.sender, account = %req.account, selector = %req.call.entry_point_selector, "tx enqueued");
    }

    pub fn submitted(&self, tx: &InflightTx) {
        self.metrics.inc_counter(metrics::SUBMITTED);
        info!(sender = %tx.sender, account = %tx.account, nonce = tx.nonce, tx = %tx.hash, "tx broadcast");
        self.emit(TxEvent::Submitted { sender: tx.sender.clone(), account: tx.account, nonce: tx.nonce, hash: tx.hash });
    }

    pub fn retrying(&self, account: &Address, attempt: u32, err: &ChainError, backoff: Duration) {
        self.metrics.inc_counter(metrics::SUBMIT_RETRIES);
        warn!(account = %account, attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "transient submit failure, retrying");
    }

    pub fn dropped(&self, req: &TxRequest, reason: &str) {
        self.metrics.inc_counter(metrics::DROPPED);
        warn!(sender = %req.sender, account = %req.account, reason, "tx dropped before broadcast");
        self.emit(TxEvent::Dropped { sender: req.sender.clone(), account: req.account, reason: reason.to_string() });
    }

    pub fn confirmed(&self, tx: &InflightTx) {
        self.metrics.inc_counter(metrics::CONFIRMED);
        info!(sender = %tx.sender, nonce = tx.nonce, tx = %tx.hash, elapsed_ms = tx.submitted_at.elapsed().as_millis() as u64, "tx confirmed");
        self.emit(TxEvent::Confirmed { sender: tx.sender.clone(), hash: tx.hash });
    }

    pub fn failed(&self, tx: &InflightTx, reason: &str) {
        self.metrics.inc_counter(metrics::FAILED);
        warn!(sender = %tx.sender, nonce = tx.nonce, tx = %tx.hash, reason, "tx failed on chain");
        self.emit(TxEvent::Failed { sender: tx.sender.clone(), hash: tx.hash, reason: reason.to_string() });
    }

    pub fn timed_out(&self, tx: &InflightTx) {
        self.metrics.inc_counter(metrics::TIMED_OUT);
        warn!(sender = %tx.sender, nonce = tx.nonce, tx = %tx.hash, "tx not confirmed within timeout, no longer tracked");
        self.emit(TxEvent::TimedOut { sender: tx.sender.clone(), hash: tx.hash });
    }

    pub fn depth(&self, queued: usize, unconfirmed: usize) {
        self.metrics.set_gauge(metrics::QUEUED_GAUGE, queued as f64);
        self.metrics.set_gauge(metrics::UNCONFIRMED_GAUGE, unconfirmed as f64);
        debug!(queued, unconfirmed, "inflight count");
    }
}
