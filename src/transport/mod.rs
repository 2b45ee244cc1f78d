//! Transports executing a flattened batch of contract reads in a single round trip.
//!
//! The scheduler only depends on [`BatchTransport`]. [`Multicall3Transport`] is the production
//! implementation, folding every request of a window into `aggregate3` calls.

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, Bytes, ChainId},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

mod error;
pub use error::TransportError;

mod multicall3;
pub use multicall3::{IMulticall3, Multicall3Transport};

mod timeout;
pub use timeout::{TimeoutLayer, TimeoutService};

/// A single contract read as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Contract to call.
    pub target: Address,
    /// Function to call on `target`.
    pub function: Arc<Function>,
    /// Arguments, in declaration order.
    pub params: Vec<DynSolValue>,
}

/// Outcome of a single [`BatchRequest`] as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCallResult {
    /// Whether the call succeeded (did not revert).
    pub success: bool,
    /// The raw return data, if any.
    pub output: Option<Bytes>,
}

impl RawCallResult {
    /// A successful result carrying `output`.
    pub fn succeeded(output: impl Into<Bytes>) -> Self {
        Self { success: true, output: Some(output.into()) }
    }

    /// A failed result without output.
    pub fn failed() -> Self {
        Self { success: false, output: None }
    }
}

/// Executes a batch of reads against a chain in one round trip.
///
/// Implementations must return exactly one [`RawCallResult`] per request, in request order.
/// Per-call failures (reverts) are reported through [`RawCallResult::success`]; an `Err` means
/// the round trip itself failed.
#[async_trait]
pub trait BatchTransport: Debug + Send + Sync {
    /// Executes `requests` on `chain_id`.
    async fn execute_batch(
        &self,
        chain_id: ChainId,
        requests: Vec<BatchRequest>,
    ) -> Result<Vec<RawCallResult>, TransportError>;
}

#[async_trait]
impl<T: BatchTransport + ?Sized> BatchTransport for Arc<T> {
    async fn execute_batch(
        &self,
        chain_id: ChainId,
        requests: Vec<BatchRequest>,
    ) -> Result<Vec<RawCallResult>, TransportError> {
        (**self).execute_batch(chain_id, requests).await
    }
}
