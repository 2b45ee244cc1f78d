use super::{
    CallGroup, CallRequest, OutcomeReceiver, PendingBatch, SchedulerMessage, dispatch::dispatch,
    outcome_channel,
};
use crate::{
    constants::DEFAULT_BATCH_DELAY, error::CallError, metrics::BatchMetrics,
    transport::BatchTransport,
};
use alloy::{json_abi::Function, primitives::ChainId};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, trace};

/// Handle for enqueueing calls on a [`BatchScheduler`].
#[derive(Debug, Clone)]
pub struct BatchSchedulerHandle {
    chain_id: ChainId,
    sender: mpsc::UnboundedSender<SchedulerMessage>,
}

impl BatchSchedulerHandle {
    /// The chain of the scheduler.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Adds a group of calls to the current window.
    ///
    /// Returns immediately. The receiver resolves with one outcome per call once the window has
    /// been dispatched, or with [`CallError::Transport`] if its round trip failed.
    pub fn enqueue(
        &self,
        function: Arc<Function>,
        calls: Vec<Option<CallRequest>>,
    ) -> Result<OutcomeReceiver, CallError> {
        let (outcome, rx) = outcome_channel();
        let group = CallGroup { chain_id: self.chain_id, function, calls, outcome };
        self.sender
            .send(SchedulerMessage::Enqueue(group))
            .map_err(|_| CallError::SchedulerClosed)?;
        Ok(rx)
    }

    /// Dispatches the current window and stops the scheduler.
    ///
    /// Resolves once the last window has been dispatched. Enqueueing afterwards fails with
    /// [`CallError::SchedulerClosed`].
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(SchedulerMessage::Shutdown { response: tx }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Returns true if the scheduler stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Coalesces the calls of a single chain into one transport round trip per window.
///
/// The scheduler moves through `Idle -> Accumulating -> Dispatching -> Idle`:
/// - the first group arriving while idle opens a window and arms a timer of `batch_delay`,
/// - groups arriving before the timer fires join the window,
/// - when the timer fires the window is detached and handed to its own dispatch task, and the
///   scheduler is idle again. Groups arriving from now on open a new window.
#[derive(Debug)]
pub struct BatchScheduler {
    chain_id: ChainId,
    receiver: mpsc::UnboundedReceiver<SchedulerMessage>,
    transport: Arc<dyn BatchTransport>,
    batch_delay: Duration,
    metrics: Arc<BatchMetrics>,
}

/// Why a window stopped accumulating.
enum WindowEnd {
    /// The timer fired.
    Elapsed,
    /// A shutdown was requested.
    Shutdown(oneshot::Sender<()>),
    /// Every handle was dropped.
    Closed,
}

impl BatchScheduler {
    /// Creates a scheduler for `chain_id` with the default batch delay.
    pub fn new(
        chain_id: ChainId,
        transport: Arc<dyn BatchTransport>,
    ) -> (Self, BatchSchedulerHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            chain_id,
            receiver,
            transport,
            batch_delay: DEFAULT_BATCH_DELAY,
            metrics: Arc::new(BatchMetrics::for_chain(chain_id)),
        };
        (scheduler, BatchSchedulerHandle { chain_id, sender })
    }

    /// Sets how long a window stays open after its first group arrived.
    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// Spawns the scheduler.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(chain_id = self.chain_id, batch_delay = ?self.batch_delay, "Starting batch scheduler");

        while let Some(message) = self.receiver.recv().await {
            let first = match message {
                SchedulerMessage::Enqueue(group) => group,
                SchedulerMessage::Shutdown { response } => {
                    self.receiver.close();
                    let _ = response.send(());
                    break;
                }
            };

            let mut batch = PendingBatch::new(first);
            let end = self.accumulate(&mut batch).await;
            let dispatched = self.dispatch(batch);

            match end {
                WindowEnd::Elapsed => {}
                WindowEnd::Shutdown(response) => {
                    self.receiver.close();
                    let _ = dispatched.await;
                    let _ = response.send(());
                    break;
                }
                WindowEnd::Closed => break,
            }
        }

        // Reject groups that were queued behind a shutdown.
        self.receiver.close();
        info!(chain_id = self.chain_id, "Batch scheduler stopped");
    }

    /// Collects groups into `batch` until the window ends.
    async fn accumulate(&mut self, batch: &mut PendingBatch) -> WindowEnd {
        let deadline = tokio::time::sleep(self.batch_delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => return WindowEnd::Elapsed,
                message = self.receiver.recv() => match message {
                    Some(SchedulerMessage::Enqueue(group)) => {
                        trace!(chain_id = self.chain_id, calls = group.calls.len(), "Group joined window");
                        batch.push(group);
                    }
                    Some(SchedulerMessage::Shutdown { response }) => {
                        return WindowEnd::Shutdown(response);
                    }
                    None => return WindowEnd::Closed,
                },
            }
        }
    }

    /// Hands a detached window to its own dispatch task.
    fn dispatch(&self, batch: PendingBatch) -> JoinHandle<()> {
        debug!(
            chain_id = self.chain_id,
            groups = batch.len(),
            slots = batch.num_slots(),
            "Window closed"
        );
        let transport = self.transport.clone();
        let metrics = self.metrics.clone();
        let chain_id = self.chain_id;
        tokio::spawn(async move {
            let timings = dispatch(transport.as_ref(), &metrics, batch).await;
            trace!(
                chain_id,
                round_trip = ?timings.round_trip,
                window = ?timings.window,
                "Window resolved"
            );
        })
    }
}
