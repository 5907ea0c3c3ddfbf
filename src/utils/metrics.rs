use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;

pub const ENQUEUED: &str = "txm_enqueued";
pub const SUBMITTED: &str = "txm_submitted";
pub const SUBMIT_RETRIES: &str = "txm_submit_retries";
pub const CONFIRMED: &str = "txm_confirmed";
pub const FAILED: &str = "txm_failed";
pub const TIMED_OUT: &str = "txm_timed_out";
pub const DROPPED: &str = "txm_dropped";

pub const QUEUED_GAUGE: &str = "txm_queued";
pub const UNCONFIRMED_GAUGE: &str = "txm_unconfirmed";

/// Metrics registry (simple, Prometheus-style)
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_counter(&self, name: &str) {
        *self.counters.lock().entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn set_gauge(&self, name: &str, val: f64) {
        self.gauges.lock().insert(name.to_string(), val);
    }

    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.lock().get(name).copied()
    }

    pub fn snapshot(&self) -> (HashMap<String, u64>, HashMap<String, f64>) {
        (self.counters.lock().clone(), self.gauges.lock().clone())
    }
}
