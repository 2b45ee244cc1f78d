//! Batch caller error types.
use crate::transport::TransportError;
use alloy::primitives::ChainId;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the batch scheduler and the [`BatchCaller`] façade.
///
/// Individual call failures (reverts, malformed targets) are not errors: they are reported
/// as [`CallOutcome::Failure`] for the affected slot only. The exception is
/// [`BatchCaller::call`], which has a single slot and reports its failure as
/// [`CallError::CallFailed`].
///
/// [`BatchCaller`]: crate::caller::BatchCaller
/// [`BatchCaller::call`]: crate::caller::BatchCaller::call
/// [`CallOutcome::Failure`]: crate::batch::CallOutcome::Failure
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The round trip carrying this call could not be completed.
    ///
    /// Every group of the affected window receives the same error.
    #[error("batch transport failed: {0}")]
    Transport(Arc<TransportError>),
    /// No scheduler is registered for the chain.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// The scheduler was shut down before the call could be resolved.
    #[error("batch scheduler is closed")]
    SchedulerClosed,
    /// A single call made through [`BatchCaller::call`](crate::caller::BatchCaller::call)
    /// failed.
    #[error("call to {target} failed")]
    CallFailed {
        /// The target of the failed call.
        target: String,
    },
}

impl CallError {
    /// Returns the transport error if this is a [`CallError::Transport`].
    pub fn as_transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the whole round trip failed, as opposed to a single call.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Arc::new(err))
    }
}
