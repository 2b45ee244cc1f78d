//! Registry of the batch schedulers of all supported chains.

use crate::{
    batch::{BatchScheduler, BatchSchedulerHandle, CallRequest, OutcomeReceiver},
    constants::DEFAULT_BATCH_DELAY,
    error::CallError,
    transport::BatchTransport,
};
use alloy::{
    json_abi::Function,
    primitives::{ChainId, map::HashMap},
};
use futures_util::future::join_all;
use std::{sync::Arc, time::Duration};

/// One [`BatchScheduler`] per chain.
///
/// Built once at startup and shared by reference; cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct BatchCallers {
    schedulers: Arc<HashMap<ChainId, BatchSchedulerHandle>>,
}

impl BatchCallers {
    /// Spawns a scheduler for every `(chain, transport)` pair using `batch_delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        transports: impl IntoIterator<Item = (ChainId, Arc<dyn BatchTransport>)>,
        batch_delay: Duration,
    ) -> Self {
        Self::from_handles(transports.into_iter().map(|(chain_id, transport)| {
            let (scheduler, handle) = BatchScheduler::new(chain_id, transport);
            scheduler.with_batch_delay(batch_delay).spawn();
            handle
        }))
    }

    /// Spawns schedulers with the default batch delay.
    pub fn spawn_with_default_delay(
        transports: impl IntoIterator<Item = (ChainId, Arc<dyn BatchTransport>)>,
    ) -> Self {
        Self::spawn(transports, DEFAULT_BATCH_DELAY)
    }

    /// Creates a registry from already spawned schedulers.
    ///
    /// If two handles share a chain, the last one wins.
    pub fn from_handles(handles: impl IntoIterator<Item = BatchSchedulerHandle>) -> Self {
        let schedulers = handles.into_iter().map(|handle| (handle.chain_id(), handle)).collect();
        Self { schedulers: Arc::new(schedulers) }
    }

    /// The scheduler of `chain_id`.
    pub fn get(&self, chain_id: ChainId) -> Option<&BatchSchedulerHandle> {
        self.schedulers.get(&chain_id)
    }

    /// Adds a group of calls to the current window of `chain_id`.
    pub fn enqueue(
        &self,
        chain_id: ChainId,
        function: Arc<Function>,
        calls: Vec<Option<CallRequest>>,
    ) -> Result<OutcomeReceiver, CallError> {
        self.get(chain_id).ok_or(CallError::UnsupportedChain(chain_id))?.enqueue(function, calls)
    }

    /// The supported chains.
    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.schedulers.keys().copied()
    }

    /// Whether `chain_id` has a scheduler.
    pub fn supports(&self, chain_id: ChainId) -> bool {
        self.schedulers.contains_key(&chain_id)
    }

    /// Dispatches pending windows and stops every scheduler.
    pub async fn shutdown(&self) {
        join_all(self.schedulers.values().map(|handle| handle.shutdown())).await;
    }
}
