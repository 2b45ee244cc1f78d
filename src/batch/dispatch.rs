use super::{CallGroup, CallOutcome, PendingBatch};
use crate::{
    error::CallError,
    metrics::BatchMetrics,
    transport::{BatchRequest, BatchTransport, RawCallResult, TransportError},
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// How a single slot of a group is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The slot was sent and consumes the next transport result.
    Request,
    /// The slot was empty or its target malformed. It resolves to [`CallOutcome::Failure`]
    /// without consuming a transport result.
    Skipped,
}

/// Slot layout of a flattened batch, one entry per group in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLayout {
    groups: Vec<Vec<Slot>>,
    requests: usize,
}

impl SlotLayout {
    /// Number of transport results this layout consumes.
    pub fn num_requests(&self) -> usize {
        self.requests
    }

    /// Number of slots resolved without a transport result.
    pub fn num_skipped(&self) -> usize {
        self.groups.iter().flatten().filter(|slot| **slot == Slot::Skipped).count()
    }

    /// The slots of every group.
    pub fn groups(&self) -> &[Vec<Slot>] {
        &self.groups
    }
}

/// Transport requests of a batch, together with the layout needed to map results back.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    /// Requests in slot order, skipped slots left out.
    pub requests: Vec<BatchRequest>,
    /// Where each request came from.
    pub layout: SlotLayout,
}

/// Flattens groups into a single ordered request list.
///
/// Groups are walked in arrival order and calls in their original order. Empty slots and
/// malformed targets are skipped.
pub fn flatten(groups: &[CallGroup]) -> DispatchPlan {
    let mut plan = DispatchPlan::default();

    for group in groups {
        let mut slots = Vec::with_capacity(group.calls.len());
        for call in &group.calls {
            let Some((call, target)) =
                call.as_ref().and_then(|call| call.target_address().map(|target| (call, target)))
            else {
                trace!(chain_id = group.chain_id, ?call, "Skipping call");
                slots.push(Slot::Skipped);
                continue;
            };

            plan.requests.push(BatchRequest {
                target,
                function: group.function.clone(),
                params: call.params.clone(),
            });
            slots.push(Slot::Request);
        }
        plan.layout.groups.push(slots);
    }

    plan.layout.requests = plan.requests.len();
    plan
}

/// Maps ordered transport results back onto the slots of every group.
///
/// Returns one outcome list per group, each matching its group's calls in length and order.
/// Fails if the number of results does not match the number of requests of the layout.
pub fn demultiplex(
    layout: &SlotLayout,
    results: &[RawCallResult],
) -> Result<Vec<Vec<CallOutcome>>, TransportError> {
    if results.len() != layout.requests {
        return Err(TransportError::ResultCountMismatch {
            expected: layout.requests,
            actual: results.len(),
        });
    }

    let mut results = results.iter();
    let mut outcomes = Vec::with_capacity(layout.groups.len());
    for slots in &layout.groups {
        let mut group = Vec::with_capacity(slots.len());
        for slot in slots {
            let outcome = match slot {
                Slot::Skipped => CallOutcome::Failure,
                Slot::Request => match results.next() {
                    Some(RawCallResult { success: true, output }) => {
                        CallOutcome::Success { output: output.clone().unwrap_or_default() }
                    }
                    _ => CallOutcome::Failure,
                },
            };
            group.push(outcome);
        }
        outcomes.push(group);
    }

    Ok(outcomes)
}

/// Timings recorded for a dispatched window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DispatchTimings {
    /// Duration of the transport round trip.
    pub(crate) round_trip: Duration,
    /// Time from opening the window to resolving its groups.
    pub(crate) window: Duration,
}

/// Dispatches a detached batch and resolves every group.
///
/// The transport is invoked exactly once, even if every slot was skipped.
pub(crate) async fn dispatch(
    transport: &dyn BatchTransport,
    metrics: &BatchMetrics,
    batch: PendingBatch,
) -> DispatchTimings {
    let chain_id = batch.chain_id();
    let opened_at = batch.opened_at();
    let groups = batch.into_groups();
    let DispatchPlan { requests, layout } = flatten(&groups);

    metrics.record_dispatch(groups.len(), requests.len(), layout.num_skipped());
    debug!(
        chain_id,
        groups = groups.len(),
        requests = requests.len(),
        skipped = layout.num_skipped(),
        "Dispatching batch"
    );

    let start = Instant::now();
    let result = transport
        .execute_batch(chain_id, requests)
        .await
        .and_then(|results| demultiplex(&layout, &results));
    let round_trip = start.elapsed();
    metrics.record_round_trip(round_trip);

    match result {
        Ok(outcomes) => {
            let failed = outcomes.iter().flatten().filter(|outcome| !outcome.is_success()).count();
            metrics.failed_slots.increment(failed as u64);
            for (group, outcomes) in groups.into_iter().zip(outcomes) {
                group.outcome.fulfill(outcomes);
            }
        }
        Err(err) => {
            warn!(chain_id, groups = groups.len(), %err, "Batch transport failed");
            metrics.transport_failures.increment(1);
            let err = CallError::from(err);
            for group in groups {
                group.outcome.fail(err.clone());
            }
        }
    }

    let window = opened_at.elapsed();
    metrics.window_latency.record(window.as_millis() as f64);

    DispatchTimings { round_trip, window }
}
