//! In-memory chain used by the devnet binary and tests.
//!
//! Behaves like a single sequencer: verifies signatures, enforces nonce order
//! per account (pending-inclusive), and finalizes transactions after a
//! configurable latency. Failure injection knobs exist for exercising the
//! manager's retry / drop / timeout paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use futures::future::pending;
use parking_lot::Mutex;
use tokio::time::sleep;

use crate::chain::client::ChainClient;
use crate::chain::types::{Address, SignedTransaction, TxHash, TxStatus};
use crate::utils::ChainError;

pub const DEVNET_CHAIN_ID: &str = "PECU_DEVNET";

struct TxRecord {
    account: Address,
    submitted_at: Instant,
    revert_reason: Option<String>,
}

#[derive(Default)]
struct ChainState {
    nonces: HashMap<Address, u64>,
    txs: HashMap<TxHash, TxRecord>,
    submissions: Vec<SignedTransaction>,
    submit_delays: HashMap<Address, Duration>,
    injected_failures: HashMap<Address, VecDeque<ChainError>>,
    offline_accounts: HashSet<Address>,
    stalled_submits: HashSet<Address>,
    stalled_status: HashSet<Address>,
    reverting_selectors: HashSet<String>,
    status_unavailable: bool,
}

pub struct InMemoryChain {
    chain_id: String,
    // None => transactions never finalize
    confirm_after: Mutex<Option<Duration>>,
    state: Mutex<ChainState>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(DEVNET_CHAIN_ID)
    }
}

impl InMemoryChain {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            confirm_after: Mutex::new(Some(Duration::ZERO)),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Time from submission until a transaction reports `Confirmed`; `None` keeps
    /// everything pending forever.
    pub fn set_confirmation_latency(&self, latency: Option<Duration>) {
        *self.confirm_after.lock() = latency;
    }

    /// Delay every submission from `account` by `delay`.
    pub fn set_submit_delay(&self, account: Address, delay: Duration) {
        self.state.lock().submit_delays.insert(account, delay);
    }

    /// Queue errors returned (in order) by the next submissions from `account`.
    pub fn inject_submit_failures(&self, account: Address, errors: impl IntoIterator<Item = ChainError>) {
        self.state.lock().injected_failures.entry(account).or_default().extend(errors);
    }

    /// While offline, every submission from `account` fails with a transport error.
    pub fn set_account_offline(&self, account: Address, offline: bool) {
        let mut state = self.state.lock();
        if offline {
            state.offline_accounts.insert(account);
        } else {
            state.offline_accounts.remove(&account);
        }
    }

    /// While stalled, submissions from `account` never return.
    pub fn stall_submissions(&self, account: Address, stalled: bool) {
        let mut state = self.state.lock();
        if stalled {
            state.stalled_submits.insert(account);
        } else {
            state.stalled_submits.remove(&account);
        }
    }

    /// While stalled, status queries for `account`'s transactions never return.
    pub fn stall_status(&self, account: Address, stalled: bool) {
        let mut state = self.state.lock();
        if stalled {
            state.stalled_status.insert(account);
        } else {
            state.stalled_status.remove(&account);
        }
    }

    /// Calls to `selector` are accepted but revert on execution.
    pub fn revert_entry_point(&self, selector: impl Into<String>) {
        self.state.lock().reverting_selectors.insert(selector.into());
    }

    /// Make status queries fail with a transport error.
    pub fn set_status_unavailable(&self, unavailable: bool) {
        self.state.lock().status_unavailable = unavailable;
    }

    /// Every accepted transaction, in acceptance order.
    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.state.lock().submissions.clone()
    }

    pub fn submissions_for(&self, account: &Address) -> Vec<SignedTransaction> {
        self.state.lock().submissions.iter().filter(|tx| &tx.payload.account == account).cloned().collect()
    }

    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.state.lock().nonces.get(account).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ChainClient for InMemoryChain {
    async fn chain_id(&self) -> Result<String, ChainError> {
        Ok(self.chain_id.clone())
    }

    async fn account_nonce(&self, account: &Address) -> Result<u64, ChainError> {
        Ok(self.nonce_of(account))
    }

    async fn submit_transaction(&self, tx: SignedTransaction) -> Result<TxHash, ChainError> {
        let account = tx.payload.account;
        let (delay, stalled) = {
            let state = self.state.lock();
            (state.submit_delays.get(&account).copied(), state.stalled_submits.contains(&account))
        };
        if let Some(d) = delay {
            sleep(d).await;
        }
        if stalled {
            pending::<()>().await;
        }

        let mut state = self.state.lock();
        if state.offline_accounts.contains(&account) {
            return Err(ChainError::Transport(format!("account {} unreachable", account)));
        }
        if let Some(err) = state.injected_failures.get_mut(&account).and_then(|q| q.pop_front()) {
            return Err(err);
        }

        tx.verify().map_err(|e| ChainError::Rejected(e.to_string()))?;
        if tx.payload.chain_id != self.chain_id {
            return Err(ChainError::Rejected(format!("wrong chain id {}", tx.payload.chain_id)));
        }
        let expected = state.nonces.get(&account).copied().unwrap_or(0);
        if tx.payload.nonce != expected {
            return Err(ChainError::InvalidNonce { expected, got: tx.payload.nonce });
        }

        state.nonces.insert(account, expected + 1);
        let revert_reason = state
            .reverting_selectors
            .contains(&tx.payload.call.entry_point_selector)
            .then(|| format!("entry point {} reverted", tx.payload.call.entry_point_selector));
        let hash = tx.hash;
        state.txs.insert(hash, TxRecord { account, submitted_at: Instant::now(), revert_reason });
        state.submissions.push(tx);
        Ok(hash)
    }

    async fn transaction_status(&self, hash: &TxHash) -> Result<TxStatus, ChainError> {
        let stalled = {
            let state = self.state.lock();
            state.txs.get(hash).map(|r| state.stalled_status.contains(&r.account)).unwrap_or(false)
        };
        if stalled {
            pending::<()>().await;
        }

        let confirm_after = *self.confirm_after.lock();
        let state = self.state.lock();
        if state.status_unavailable {
            return Err(ChainError::Transport("status endpoint unavailable".into()));
        }
        let record = match state.txs.get(hash) {
            Some(r) => r,
            None => return Ok(TxStatus::Unknown),
        };
        let finalized = confirm_after.map(|after| record.submitted_at.elapsed() >= after).unwrap_or(false);
        Ok(match (&record.revert_reason, finalized) {
            (_, false) => TxStatus::Pending,
            (Some(reason), true) => TxStatus::Reverted(reason.clone()),
            (None, true) => TxStatus::Confirmed,
        })
    }
}
