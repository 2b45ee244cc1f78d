//! `call` and `multicall` entry points for application code.
//!
//! Calls issued concurrently on the same chain are merged into a single round trip:
//!
//! ```ignore
//! let balance_of = Arc::new(Function::parse("function balanceOf(address) view returns (uint256)")?);
//! let (usdc, usdt) = tokio::try_join!(
//!     caller.call(1, balance_of.clone(), USDC, vec![owner.into()]),
//!     caller.call(1, balance_of.clone(), USDT, vec![owner.into()]),
//! )?;
//! ```

use crate::{
    batch::{CallOutcome, CallRequest},
    error::CallError,
    registry::BatchCallers,
};
use alloy::{
    dyn_abi::{DynSolValue, FunctionExt},
    json_abi::Function,
    primitives::ChainId,
};
use std::sync::Arc;
use tracing::debug;

/// Decoded result of a single slot of a [`BatchCaller::multicall`].
///
/// Every result carries the call it answers, so results can be fed into a follow-up multicall
/// without re-zipping them with their inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum MulticallResult {
    /// The call succeeded and its output decoded.
    Success {
        /// The call.
        input: CallRequest,
        /// Decoded outputs, in declaration order.
        output: Vec<DynSolValue>,
    },
    /// The slot was empty, the target malformed, the call reverted or its output did not decode.
    Failure {
        /// The call, `None` for empty slots.
        input: Option<CallRequest>,
    },
}

impl MulticallResult {
    /// Returns true for [`MulticallResult::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The call this result answers.
    pub fn input(&self) -> Option<&CallRequest> {
        match self {
            Self::Success { input, .. } => Some(input),
            Self::Failure { input } => input.as_ref(),
        }
    }

    /// The decoded outputs of a successful call.
    pub fn output(&self) -> Option<&[DynSolValue]> {
        match self {
            Self::Success { output, .. } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    /// Consumes the result, returning the decoded outputs of a successful call.
    pub fn into_output(self) -> Option<Vec<DynSolValue>> {
        match self {
            Self::Success { output, .. } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    fn decode(function: &Function, input: Option<CallRequest>, outcome: CallOutcome) -> Self {
        let (Some(input), CallOutcome::Success { output }) = (input.clone(), outcome) else {
            return Self::Failure { input };
        };

        match function.abi_decode_output(&output) {
            Ok(output) => Self::Success { input, output },
            Err(err) => {
                debug!(
                    target = %input.target,
                    function = %function.signature(),
                    %err,
                    "Failed to decode call output"
                );
                Self::Failure { input: Some(input) }
            }
        }
    }
}

/// Entry point for batched contract reads.
#[derive(Debug, Clone)]
pub struct BatchCaller {
    callers: BatchCallers,
}

impl BatchCaller {
    /// Creates a caller on top of a scheduler registry.
    pub fn new(callers: BatchCallers) -> Self {
        Self { callers }
    }

    /// The scheduler registry.
    pub fn callers(&self) -> &BatchCallers {
        &self.callers
    }

    /// Calls `function` on every target of `calls`, returning the raw outcomes.
    ///
    /// The outcomes match `calls` in length and order. `None` slots and malformed targets are
    /// never sent and always resolve to [`CallOutcome::Failure`].
    pub async fn multicall_raw(
        &self,
        chain_id: ChainId,
        function: impl Into<Arc<Function>>,
        calls: Vec<Option<CallRequest>>,
    ) -> Result<Vec<CallOutcome>, CallError> {
        self.callers.enqueue(chain_id, function.into(), calls)?.await
    }

    /// Calls `function` on every target of `calls`, decoding the outputs.
    ///
    /// The results match `calls` in length and order. A slot whose output cannot be decoded
    /// fails on its own, without affecting its siblings.
    pub async fn multicall(
        &self,
        chain_id: ChainId,
        function: impl Into<Arc<Function>>,
        calls: Vec<Option<CallRequest>>,
    ) -> Result<Vec<MulticallResult>, CallError> {
        let function = function.into();
        let outcomes = self.multicall_raw(chain_id, function.clone(), calls.clone()).await?;

        Ok(calls
            .into_iter()
            .zip(outcomes)
            .map(|(input, outcome)| MulticallResult::decode(&function, input, outcome))
            .collect())
    }

    /// Calls `function` on `target`, decoding the output.
    ///
    /// Fails with [`CallError::CallFailed`] if the target is malformed, the call reverts or its
    /// output does not decode.
    pub async fn call(
        &self,
        chain_id: ChainId,
        function: impl Into<Arc<Function>>,
        target: impl Into<String>,
        params: Vec<DynSolValue>,
    ) -> Result<Vec<DynSolValue>, CallError> {
        let request = CallRequest::new(target).with_params(params);
        let target = request.target.clone();

        match self.multicall(chain_id, function, vec![Some(request)]).await?.pop() {
            Some(MulticallResult::Success { output, .. }) => Ok(output),
            _ => Err(CallError::CallFailed { target }),
        }
    }
}
