//! Per-account request queues.
//!
//! One FIFO buffer per sender plus an `active` flag marking whether a worker
//! currently owns the sender. The flag is only flipped under the map lock, by
//! `push` (activate) and by `front` on an empty buffer (retire), so a request is
//! never left behind without a worker.
//!
//! A request stays in its buffer while it is being broadcast and is removed with
//! `pop_front` once the broadcast has an outcome; until then it counts as queued.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::crypto::KeyId;
use crate::txm::types::TxRequest;

#[derive(Default)]
struct AccountQueue {
    pending: VecDeque<TxRequest>,
    active: bool,
}

#[derive(Default)]
pub struct AccountQueues {
    accounts: Mutex<HashMap<KeyId, AccountQueue>>,
    queued: AtomicUsize,
}

impl AccountQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Returns true if the sender had no active worker and the
    /// caller is now responsible for starting one.
    pub fn push(&self, req: TxRequest) -> bool {
        let mut accounts = self.accounts.lock();
        let q = accounts.entry(req.sender.clone()).or_default();
        q.pending.push_back(req);
        self.queued.fetch_add(1, Ordering::SeqCst);
        if q.active {
            false
        } else {
            q.active = true;
            true
        }
    }

    /// Oldest request for `sender`, left in place. An empty buffer retires the worker.
    pub fn front(&self, sender: &str) -> Option<TxRequest> {
        let mut accounts = self.accounts.lock();
        let q = accounts.get_mut(sender)?;
        match q.pending.front() {
            Some(req) => Some(req.clone()),
            None => {
                q.active = false;
                None
            }
        }
    }

    pub fn pop_front(&self, sender: &str) -> Option<TxRequest> {
        let mut accounts = self.accounts.lock();
        let req = accounts.get_mut(sender)?.pending.pop_front();
        if req.is_some() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
        req
    }

    /// Retire the worker without draining (shutdown).
    pub fn deactivate(&self, sender: &str) {
        if let Some(q) = self.accounts.lock().get_mut(sender) {
            q.active = false;
        }
    }

    pub fn is_active(&self, sender: &str) -> bool {
        self.accounts.lock().get(sender).map(|q| q.active).unwrap_or(false)
    }

    pub fn len_of(&self, sender: &str) -> usize {
        self.accounts.lock().get(sender).map(|q| q.pending.len()).unwrap_or(0)
    }

    /// Requests across all senders.
    pub fn total(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Senders seen so far, active or not.
    pub fn known_senders(&self) -> usize {
        self.accounts.lock().len()
    }
}
