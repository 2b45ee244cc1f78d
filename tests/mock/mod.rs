//! Recording transport used by the integration tests.
#![allow(dead_code, unreachable_pub)]

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, Bytes, ChainId, U256, bytes},
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use batch_caller::{
    BatchCallers, CallRequest,
    transport::{BatchRequest, BatchTransport, RawCallResult, TransportError},
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

pub const CHAIN_X: ChainId = 1;
pub const CHAIN_Y: ChainId = 10;
pub const BATCH_DELAY: Duration = Duration::from_millis(10);

pub const TOKEN_A: &str = "0x0000000000000000000000000000000000000001";
pub const TOKEN_B: &str = "0x0000000000000000000000000000000000000002";
pub const TOKEN_C: &str = "0x0000000000000000000000000000000000000003";
/// Calls to this target revert.
pub const REVERTING: &str = "0x00000000000000000000000000000000000000ff";

/// A single round trip seen by the [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub chain_id: ChainId,
    pub targets: Vec<Address>,
}

/// Answers every call with the target address as `uint256`, except calls to [`REVERTING`].
#[derive(Debug, Default)]
pub struct MockTransport {
    invocations: Mutex<Vec<Invocation>>,
    failures: AtomicUsize,
    latency: Option<Duration>,
    truncate: bool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails the next `failures` round trips.
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self { failures: AtomicUsize::new(failures), ..Default::default() })
    }

    /// Takes `latency` to answer.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self { latency: Some(latency), ..Default::default() })
    }

    /// Answers with one result less than requested.
    pub fn truncating() -> Arc<Self> {
        Arc::new(Self { truncate: true, ..Default::default() })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchTransport for MockTransport {
    async fn execute_batch(
        &self,
        chain_id: ChainId,
        requests: Vec<BatchRequest>,
    ) -> Result<Vec<RawCallResult>, TransportError> {
        let targets = requests.iter().map(|request| request.target).collect();
        self.invocations.lock().unwrap().push(Invocation { chain_id, targets });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }

        let reverting = REVERTING.parse::<Address>().unwrap();
        let answered = if self.truncate { requests.len().saturating_sub(1) } else { requests.len() };
        Ok(requests[..answered]
            .iter()
            .map(|request| {
                if request.target == reverting {
                    RawCallResult { success: false, output: Some(bytes!("08c379a0")) }
                } else {
                    RawCallResult::succeeded(encoded_target(request.target))
                }
            })
            .collect())
    }
}

/// The output the mock returns for a call to `target`.
pub fn encoded_target(target: Address) -> Bytes {
    Bytes::copy_from_slice(&U256::from_be_slice(target.as_slice()).to_be_bytes::<32>())
}

/// The decoded output the mock returns for a call to `target`.
pub fn decoded_target(target: &str) -> Vec<DynSolValue> {
    let target = target.parse::<Address>().unwrap();
    vec![DynSolValue::Uint(U256::from_be_slice(target.as_slice()), 256)]
}

pub fn balance_of() -> Arc<Function> {
    Arc::new(Function::parse("function balanceOf(address owner) view returns (uint256)").unwrap())
}

pub fn call(target: &str) -> Option<CallRequest> {
    Some(CallRequest::new(target).with_params([DynSolValue::Address(Address::ZERO)]))
}

pub fn addresses(targets: &[&str]) -> Vec<Address> {
    targets.iter().map(|target| target.parse().unwrap()).collect()
}

/// Spawns one scheduler per `(chain, transport)` pair.
pub fn spawn(transports: &[(ChainId, Arc<MockTransport>)]) -> BatchCallers {
    BatchCallers::spawn(
        transports
            .iter()
            .map(|(chain_id, transport)| (*chain_id, transport.clone() as Arc<dyn BatchTransport>)),
        BATCH_DELAY,
    )
}
