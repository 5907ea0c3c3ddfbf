//! Confirmation tracker: the set of broadcast-but-unresolved transactions.
//!
//! Each poll queries every entry's status concurrently and resolves it:
//! - Confirmed -> removed, success
//! - Rejected / Reverted -> removed, failure (the nonce is spent, no retry)
//! - Pending / Unknown / query error -> kept, unless older than `tx_timeout`,
//!   in which case it is removed as timed out
//!
//! A query that outlives `query_timeout` counts as a query error, so one
//! unresponsive account cannot hold up the rest of the poll.

use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::debug;

use crate::chain::{ClientAccessor, TxHash, TxStatus};
use crate::txm::telemetry::Reporter;
use crate::txm::types::InflightTx;
use crate::utils::ChainError;

/// Tally of one poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub confirmed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub pending: usize,
}

enum Resolution {
    Confirmed,
    Failed(String),
    TimedOut,
    Pending,
}

#[derive(Default)]
pub struct ConfirmationTracker {
    inflight: DashMap<TxHash, InflightTx>,
}

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx: InflightTx) {
        self.inflight.insert(tx.hash, tx);
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.inflight.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    /// Query and resolve every tracked transaction once.
    pub async fn poll_once(
        &self,
        accessor: &ClientAccessor,
        tx_timeout: Duration,
        query_timeout: Duration,
        reporter: &Reporter,
    ) -> PollSummary {
        let mut summary = PollSummary::default();
        let snapshot: Vec<InflightTx> = self.inflight.iter().map(|e| e.value().clone()).collect();
        if snapshot.is_empty() {
            return summary;
        }

        let statuses: Vec<Result<TxStatus, ChainError>> = match accessor() {
            Ok(client) => {
                let client = &client;
                join_all(snapshot.iter().map(|tx| async move {
                    timeout(query_timeout, client.transaction_status(&tx.hash))
                        .await
                        .unwrap_or(Err(ChainError::Timeout))
                }))
                .await
            }
            Err(e) => {
                debug!(error = %e, "chain client unavailable, only applying timeouts");
                snapshot.iter().map(|_| Err(e.clone())).collect()
            }
        };

        for (tx, status) in snapshot.into_iter().zip(statuses) {
            let resolution = match status {
                Ok(TxStatus::Confirmed) => Resolution::Confirmed,
                Ok(TxStatus::Rejected(reason)) => Resolution::Failed(format!("rejected: {}", reason)),
                Ok(TxStatus::Reverted(reason)) => Resolution::Failed(format!("reverted: {}", reason)),
                Ok(TxStatus::Pending) | Ok(TxStatus::Unknown) => Resolution::Pending,
                Err(e) => {
                    debug!(tx = %tx.hash, error = %e, "status query failed");
                    Resolution::Pending
                }
            };
            let resolution = match resolution {
                Resolution::Pending if tx.submitted_at.elapsed() >= tx_timeout => Resolution::TimedOut,
                other => other,
            };

            if let Resolution::Pending = resolution {
                summary.pending += 1;
                continue;
            }
            // another poller may have raced us
            if self.inflight.remove(&tx.hash).is_none() {
                continue;
            }
            match resolution {
                Resolution::Confirmed => {
                    summary.confirmed += 1;
                    reporter.confirmed(&tx);
                }
                Resolution::Failed(reason) => {
                    summary.failed += 1;
                    reporter.failed(&tx, &reason);
                }
                Resolution::TimedOut => {
                    summary.timed_out += 1;
                    reporter.timed_out(&tx);
                }
                Resolution::Pending => {}
            }
        }
        summary
    }
}
