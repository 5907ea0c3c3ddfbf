//! Broadcaster: signs and submits queued requests, one worker per active account.
//!
//! Per request: resolve the key, read chain id + pending-inclusive nonce, sign,
//! submit. Transient submit errors are retried with exponential backoff until
//! the `tx_timeout` budget (measured from the first attempt) runs out; nonce and
//! signature are rebuilt for every attempt. An attempt still running when the
//! budget ends is abandoned as a timeout. Permanent errors drop the request.
//! Confirmation is not awaited here; accepted transactions go to the tracker.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::chain::{ClientAccessor, TxPayload};
use crate::crypto::{Key, KeyId};
use crate::keystore::KeyResolver;
use crate::txm::confirmer::ConfirmationTracker;
use crate::txm::config::Config;
use crate::txm::queue::AccountQueues;
use crate::txm::telemetry::Reporter;
use crate::txm::types::{InflightTx, TxRequest};
use crate::utils::{ChainError, CryptoError, TxmError};

pub const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Why a request left the queue without being broadcast.
#[derive(Debug, Error)]
pub enum BroadcastFailure {
    #[error("{0}")]
    Resolve(TxmError),

    #[error("signing failed: {0}")]
    Sign(#[from] CryptoError),

    #[error("rejected: {0}")]
    Rejected(ChainError),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ChainError },

    /// Shutdown interrupted a retry; the request stays queued.
    #[error("shutdown")]
    Shutdown,
}

enum AttemptError {
    Chain(ChainError),
    Crypto(CryptoError),
}

impl From<ChainError> for AttemptError {
    fn from(e: ChainError) -> Self {
        AttemptError::Chain(e)
    }
}

impl From<CryptoError> for AttemptError {
    fn from(e: CryptoError) -> Self {
        AttemptError::Crypto(e)
    }
}

#[derive(Clone)]
pub struct Broadcaster {
    resolver: KeyResolver,
    config: Arc<dyn Config>,
    client: ClientAccessor,
    reporter: Reporter,
}

impl Broadcaster {
    pub fn new(resolver: KeyResolver, config: Arc<dyn Config>, client: ClientAccessor, reporter: Reporter) -> Self {
        Self { resolver, config, client, reporter }
    }

    /// Broadcast one request, retrying transient failures within the timeout budget.
    pub async fn broadcast(&self, req: &TxRequest, shutdown: &mut watch::Receiver<bool>) -> Result<InflightTx, BroadcastFailure> {
        let key = self.resolver.resolve(&req.sender).map_err(BroadcastFailure::Resolve)?;
        let deadline = Instant::now() + self.config.tx_timeout();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let budget = deadline.saturating_duration_since(Instant::now());
            let outcome = timeout(budget, self.attempt(&key, req))
                .await
                .unwrap_or(Err(AttemptError::Chain(ChainError::Timeout)));
            let err = match outcome {
                Ok(tx) => return Ok(tx),
                Err(AttemptError::Crypto(e)) => return Err(BroadcastFailure::Sign(e)),
                Err(AttemptError::Chain(e)) if !e.is_transient() => return Err(BroadcastFailure::Rejected(e)),
                Err(AttemptError::Chain(e)) => e,
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BroadcastFailure::Exhausted { attempts, last: err });
            }
            let wait = backoff.min(remaining);
            self.reporter.retrying(&req.account, attempts, &err, wait);

            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown.changed() => return Err(BroadcastFailure::Shutdown),
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn attempt(&self, key: &Key, req: &TxRequest) -> Result<InflightTx, AttemptError> {
        let client = (self.client)()?;
        let chain_id = client.chain_id().await?;
        let nonce = client.account_nonce(&req.account).await?;

        let payload = TxPayload { account: req.account, nonce, chain_id, call: req.call.clone() };
        let signed = payload.sign(key, key.public())?;
        debug!(
            sender = %req.sender,
            account = %req.account,
            nonce,
            tx = %signed.hash,
            queued_ms = req.enqueued_at.elapsed().as_millis() as u64,
            "submitting tx"
        );

        let hash = client.submit_transaction(signed).await?;
        Ok(InflightTx {
            sender: req.sender.clone(),
            account: req.account,
            nonce,
            hash,
            submitted_at: Instant::now(),
        })
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

/// Drain `sender`'s queue until it is empty or shutdown is signalled.
pub async fn run_account_worker(
    sender: KeyId,
    broadcaster: Broadcaster,
    queues: Arc<AccountQueues>,
    tracker: Arc<ConfirmationTracker>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%sender, "account worker started");
    loop {
        if *shutdown.borrow() {
            queues.deactivate(&sender);
            break;
        }
        // None retires the worker under the queue lock
        let req = match queues.front(&sender) {
            Some(req) => req,
            None => break,
        };

        match broadcaster.broadcast(&req, &mut shutdown).await {
            Ok(tx) => {
                queues.pop_front(&sender);
                tracker.insert(tx.clone());
                broadcaster.reporter().submitted(&tx);
            }
            Err(BroadcastFailure::Shutdown) => {
                queues.deactivate(&sender);
                break;
            }
            Err(failure) => {
                queues.pop_front(&sender);
                broadcaster.reporter().dropped(&req, &failure.to_string());
            }
        }
    }
    debug!(%sender, "account worker retired");
}
