//! Transaction manager: lifecycle, enqueue, and monitoring surface.
//!
//! Wiring:
//! - `enqueue` -> AccountQueues -> one `run_account_worker` task per active sender
//! - workers -> ConfirmationTracker <- one shared confirmation loop
//! - ServiceHandle owns every task; `close` signals and awaits them

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::chain::{Address, ClientAccessor, FunctionCall};
use crate::keystore::{KeyResolver, Keystore};
use crate::txm::broadcaster::{run_account_worker, Broadcaster};
use crate::txm::config::{validate_durations, Config};
use crate::txm::confirmer::ConfirmationTracker;
use crate::txm::queue::AccountQueues;
use crate::txm::service_handle::ServiceHandle;
use crate::txm::telemetry::Reporter;
use crate::txm::types::{LifecycleState, TxEvent, TxRequest};
use crate::utils::{MetricsRegistry, Result, TxmError};

struct Lifecycle {
    state: LifecycleState,
    // Some exactly while Started
    services: Option<ServiceHandle>,
}

struct Shared {
    lifecycle: RwLock<Lifecycle>,
    resolver: KeyResolver,
    config: Arc<dyn Config>,
    client: ClientAccessor,
    queues: Arc<AccountQueues>,
    tracker: Arc<ConfirmationTracker>,
    broadcaster: Broadcaster,
    reporter: Reporter,
    span: Span,
}

/// Handle to a transaction manager. Cheap to clone; all clones share state.
///
/// Call [`Txm::close`] to stop gracefully. Dropping the last handle of a started
/// manager signals every background task to stop but does not wait for them.
#[derive(Clone)]
pub struct Txm {
    shared: Arc<Shared>,
}

impl Txm {
    /// Build a manager. Nothing runs until `start`.
    pub fn new(keystore: Arc<dyn Keystore>, config: Arc<dyn Config>, client: ClientAccessor) -> Result<Self> {
        let (tx_timeout, poll) = (config.tx_timeout(), config.confirmation_poll());
        validate_durations(tx_timeout, poll)?;
        if poll >= tx_timeout {
            warn!(
                tx_timeout_ms = tx_timeout.as_millis() as u64,
                confirmation_poll_ms = poll.as_millis() as u64,
                "confirmation_poll is not below tx_timeout; pending transactions may time out before their first poll"
            );
        }

        let resolver = KeyResolver::new(keystore);
        let reporter = Reporter::new(MetricsRegistry::new());
        let broadcaster = Broadcaster::new(resolver.clone(), config.clone(), client.clone(), reporter.clone());
        let shared = Shared {
            lifecycle: RwLock::new(Lifecycle { state: LifecycleState::Unstarted, services: None }),
            resolver,
            config,
            client,
            queues: Arc::new(AccountQueues::new()),
            tracker: Arc::new(ConfirmationTracker::new()),
            broadcaster,
            reporter,
            span: info_span!("txm"),
        };
        Ok(Self { shared: Arc::new(shared) })
    }

    /// Launch the confirmation loop. Must be called from within a Tokio runtime;
    /// later `enqueue` calls may come from any thread.
    pub fn start(&self) -> Result<()> {
        let mut lc = self.shared.lifecycle.write();
        if lc.state != LifecycleState::Unstarted {
            return Err(TxmError::AlreadyStarted);
        }
        let runtime = Handle::try_current().map_err(|e| TxmError::NoRuntime(e.to_string()))?;

        let services = ServiceHandle::new(runtime);
        let loop_task = confirmation_loop(Arc::downgrade(&self.shared), services.shutdown_rx());
        services.spawn(loop_task.instrument(self.shared.span.clone()));

        lc.state = LifecycleState::Started;
        lc.services = Some(services);
        info!(parent: &self.shared.span, "transaction manager started");
        Ok(())
    }

    pub fn ready(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Started => Ok(()),
            other => Err(TxmError::NotReady(other)),
        }
    }

    /// Stop all workers and the confirmation loop, waiting for each to finish its
    /// current unit of work. Submitted transactions are left as they are on chain
    /// and are no longer tracked.
    pub async fn close(&self) -> Result<()> {
        let services = {
            let mut lc = self.shared.lifecycle.write();
            match lc.state {
                LifecycleState::Unstarted => return Err(TxmError::NotStarted),
                LifecycleState::Stopped => return Err(TxmError::AlreadyStopped),
                LifecycleState::Started => {
                    lc.state = LifecycleState::Stopped;
                    lc.services.take()
                }
            }
        };
        if let Some(services) = services {
            services.shutdown().await;
        }

        let (queued, unconfirmed) = self.inflight_count();
        info!(parent: &self.shared.span, queued, unconfirmed, "transaction manager stopped");
        Ok(())
    }

    /// Queue a contract call for `sender` (a keystore id) acting on `account`.
    /// Returns once the request is buffered; the outcome is reported asynchronously.
    pub fn enqueue(&self, sender: &str, account: Address, call: FunctionCall) -> Result<()> {
        // held across the push so close() cannot slip between the state check and the spawn
        let lc = self.shared.lifecycle.read();
        if lc.state != LifecycleState::Started {
            return Err(TxmError::ManagerNotStarted);
        }
        // validate the key exists; the broadcaster resolves it again at send time
        self.shared.resolver.resolve(sender)?;

        let req = TxRequest::new(sender, account, call);
        self.shared.reporter.enqueued(&req);
        if self.shared.queues.push(req) {
            if let Some(services) = lc.services.as_ref() {
                let worker = run_account_worker(
                    sender.to_string(),
                    self.shared.broadcaster.clone(),
                    self.shared.queues.clone(),
                    self.shared.tracker.clone(),
                    services.shutdown_rx(),
                );
                services.spawn(worker.instrument(self.shared.span.clone()));
            }
        }
        Ok(())
    }

    /// `(queued, unconfirmed)`: requests waiting in any account queue, and
    /// broadcast transactions awaiting confirmation.
    pub fn inflight_count(&self) -> (usize, usize) {
        (self.shared.queues.total(), self.shared.tracker.len())
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lifecycle.read().state
    }

    /// Whether a worker currently owns `sender`'s queue.
    pub fn is_worker_active(&self, sender: &str) -> bool {
        self.shared.queues.is_active(sender)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.shared.reporter.subscribe()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        self.shared.reporter.metrics()
    }
}

// Holds the manager weakly: once the last handle is gone the shutdown sender
// drops with it and every task winds down.
async fn confirmation_loop(weak: Weak<Shared>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let shared = match weak.upgrade() {
            Some(shared) => shared,
            None => break,
        };
        let poll = shared.config.confirmation_poll();
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll) => {}
        }
        // each status query is bounded by one poll interval
        let round = shared.tracker.poll_once(&shared.client, shared.config.tx_timeout(), poll, &shared.reporter);
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = round => {}
        }
        shared.reporter.depth(shared.queues.total(), shared.tracker.len());
    }
    info!("confirmation loop stopped");
}
