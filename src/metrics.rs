//! Batch scheduler metrics.

use alloy::primitives::ChainId;
use metrics::{Counter, Histogram};
use metrics_derive::Metrics;
use std::time::Duration;

/// Chain specific metrics of a [`BatchScheduler`](crate::batch::BatchScheduler).
#[derive(Metrics, Clone)]
#[metrics(scope = "batch")]
pub struct BatchMetrics {
    /// Number of dispatched windows.
    pub dispatched: Counter,
    /// Number of groups dispatched.
    pub groups: Counter,
    /// Number of requests sent to the transport.
    pub requests: Counter,
    /// Number of empty or malformed slots resolved without being sent.
    pub skipped_slots: Counter,
    /// Number of slots resolved as failures, skipped slots included.
    pub failed_slots: Counter,
    /// Number of windows whose round trip failed.
    pub transport_failures: Counter,
    /// Requests per dispatched window.
    pub batch_size: Histogram,
    /// Time from opening a window to resolving its groups, in milliseconds.
    pub window_latency: Histogram,
    /// Duration of the transport round trip, in milliseconds.
    pub round_trip: Histogram,
}

impl BatchMetrics {
    /// Creates the metrics of `chain_id`.
    pub fn for_chain(chain_id: ChainId) -> Self {
        Self::new_with_labels(&[("chain_id", chain_id.to_string())])
    }

    /// Records a dispatched window.
    pub fn record_dispatch(&self, groups: usize, requests: usize, skipped: usize) {
        self.dispatched.increment(1);
        self.groups.increment(groups as u64);
        self.requests.increment(requests as u64);
        self.skipped_slots.increment(skipped as u64);
        self.batch_size.record(requests as f64);
    }

    /// Records the duration of a round trip.
    pub fn record_round_trip(&self, elapsed: Duration) {
        self.round_trip.record(elapsed.as_millis() as f64);
    }
}
