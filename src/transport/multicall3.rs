//! [`BatchTransport`] backed by the Multicall3 `aggregate3` function.

use super::{BatchRequest, BatchTransport, RawCallResult, TransportError};
use crate::constants::DEFAULT_MAX_CALLS_PER_REQUEST;
use alloy::{
    dyn_abi::JsonAbiExt,
    primitives::{Address, Bytes, ChainId},
    providers::{DynProvider, MULTICALL3_ADDRESS, Provider},
    sol,
};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, instrument, trace};

sol! {
    /// Multicall3 interface, deployed at the same address on all supported chains.
    #[sol(rpc)]
    interface IMulticall3 {
        /// A single call of an `aggregate3` batch.
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        /// Result of a single call of an `aggregate3` batch.
        struct CallResult {
            bool success;
            bytes returnData;
        }

        /// Executes all calls, reverting only if a call that does not allow failure reverts.
        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

/// Executes batches through `aggregate3` on a Multicall3 deployment.
///
/// Every call is sent with `allowFailure = true`, so a reverting call only fails its own slot.
/// Requests whose arguments cannot be ABI encoded are answered with a failed result without
/// being sent. Batches larger than `max_calls_per_request` are split into several
/// `aggregate3` calls that are executed concurrently.
#[derive(Debug, Clone)]
pub struct Multicall3Transport<P = DynProvider> {
    provider: P,
    address: Address,
    max_calls_per_request: usize,
}

impl<P> Multicall3Transport<P> {
    /// Creates a transport using the canonical Multicall3 deployment.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            address: MULTICALL3_ADDRESS,
            max_calls_per_request: DEFAULT_MAX_CALLS_PER_REQUEST,
        }
    }

    /// Uses the Multicall3 deployment at `address` instead of the canonical one.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Sets the maximum number of calls per `aggregate3` request.
    ///
    /// A value of zero disables splitting.
    pub fn with_max_calls_per_request(mut self, max_calls_per_request: usize) -> Self {
        self.max_calls_per_request = max_calls_per_request;
        self
    }

    /// The Multicall3 address this transport calls.
    pub fn address(&self) -> Address {
        self.address
    }

    fn chunk_size(&self, len: usize) -> usize {
        if self.max_calls_per_request == 0 { len.max(1) } else { self.max_calls_per_request }
    }
}

impl<P: Provider> Multicall3Transport<P> {
    async fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::CallResult>, TransportError> {
        let expected = calls.len();
        let results = IMulticall3::new(self.address, &self.provider).aggregate3(calls).call().await?;
        if results.len() != expected {
            return Err(TransportError::ResultCountMismatch { expected, actual: results.len() });
        }
        Ok(results)
    }
}

#[async_trait]
impl<P> BatchTransport for Multicall3Transport<P>
where
    P: Provider + std::fmt::Debug + Send + Sync,
{
    #[instrument(skip_all, fields(%chain_id, requests = requests.len()))]
    async fn execute_batch(
        &self,
        chain_id: ChainId,
        requests: Vec<BatchRequest>,
    ) -> Result<Vec<RawCallResult>, TransportError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = encode_requests(&requests);
        let calls: Vec<_> = encoded
            .iter()
            .zip(&requests)
            .filter_map(|(call_data, request)| {
                call_data.as_ref().map(|call_data| IMulticall3::Call3 {
                    target: request.target,
                    allowFailure: true,
                    callData: call_data.clone(),
                })
            })
            .collect();

        let chunk_size = self.chunk_size(calls.len());
        debug!(
            %chain_id,
            calls = calls.len(),
            unencodable = requests.len() - calls.len(),
            chunks = calls.len().div_ceil(chunk_size),
            "Executing aggregate3"
        );

        let results = try_join_all(calls.chunks(chunk_size).map(|chunk| self.aggregate3(chunk.to_vec())))
            .await?
            .into_iter()
            .flatten()
            .map(|result| RawCallResult { success: result.success, output: Some(result.returnData) });

        Ok(merge_results(&encoded, results))
    }
}

/// ABI encodes every request, `None` for requests whose arguments do not match the function.
fn encode_requests(requests: &[BatchRequest]) -> Vec<Option<Bytes>> {
    requests
        .iter()
        .map(|request| match request.function.abi_encode_input(&request.params) {
            Ok(call_data) => Some(call_data.into()),
            Err(err) => {
                trace!(
                    target = %request.target,
                    function = %request.function.signature(),
                    %err,
                    "Failed to encode call"
                );
                None
            }
        })
        .collect()
}

/// Places the results of the sent calls back at their request positions, filling requests that
/// were never sent with failed results.
fn merge_results(
    encoded: &[Option<Bytes>],
    mut results: impl Iterator<Item = RawCallResult>,
) -> Vec<RawCallResult> {
    encoded
        .iter()
        .map(|call_data| match call_data {
            Some(_) => results.next().unwrap_or_else(RawCallResult::failed),
            None => RawCallResult::failed(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        dyn_abi::DynSolValue,
        json_abi::Function,
        primitives::{U256, address, bytes},
        providers::ProviderBuilder,
        sol_types::SolCall,
        transports::mock::Asserter,
    };
    use std::sync::Arc;

    const TOKEN: Address = address!("0000000000000000000000000000000000000001");

    fn balance_of_request(owner: Address) -> BatchRequest {
        BatchRequest {
            target: TOKEN,
            function: balance_of(),
            params: vec![DynSolValue::Address(owner)],
        }
    }

    fn unencodable_request() -> BatchRequest {
        BatchRequest {
            target: TOKEN,
            function: balance_of(),
            params: vec![DynSolValue::Bool(true)],
        }
    }

    /// Queues the `eth_call` response of an `aggregate3` call returning `results`.
    fn push_aggregate3(asserter: &Asserter, results: Vec<IMulticall3::CallResult>) {
        let output = IMulticall3::aggregate3Call::abi_encode_returns(&results);
        asserter.push_success(&Bytes::from(output));
    }

    fn mocked_transport(asserter: &Asserter) -> Multicall3Transport {
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        Multicall3Transport::new(provider.erased())
    }

    fn balance_of() -> Arc<Function> {
        Arc::new(Function::parse("function balanceOf(address owner) view returns (uint256)").unwrap())
    }

    #[test]
    fn encodes_matching_params_only() {
        let owner = address!("0000000000000000000000000000000000000003");
        let token = address!("0000000000000000000000000000000000000001");
        let requests = vec![
            BatchRequest {
                target: token,
                function: balance_of(),
                params: vec![DynSolValue::Address(owner)],
            },
            BatchRequest {
                target: token,
                function: balance_of(),
                params: vec![DynSolValue::Uint(U256::from(1), 256)],
            },
            BatchRequest { target: token, function: balance_of(), params: vec![] },
        ];

        let encoded = encode_requests(&requests);
        assert!(encoded[0].is_some());
        assert!(encoded[1].is_none());
        assert!(encoded[2].is_none());

        // selector of balanceOf(address)
        assert_eq!(&encoded[0].as_ref().unwrap()[..4], &[0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn merge_keeps_request_positions() {
        let encoded = vec![Some(Bytes::new()), None, Some(Bytes::new()), None];
        let results = vec![RawCallResult::succeeded(bytes!("01")), RawCallResult::failed()];

        let merged = merge_results(&encoded, results.into_iter());
        assert_eq!(
            merged,
            vec![
                RawCallResult::succeeded(bytes!("01")),
                RawCallResult::failed(),
                RawCallResult::failed(),
                RawCallResult::failed(),
            ]
        );
    }

    #[test]
    fn chunk_size_defaults_and_zero() {
        let transport = Multicall3Transport::new(());
        assert_eq!(transport.chunk_size(1234), DEFAULT_MAX_CALLS_PER_REQUEST);
        assert_eq!(transport.address(), MULTICALL3_ADDRESS);

        let transport = transport.with_max_calls_per_request(0);
        assert_eq!(transport.chunk_size(1234), 1234);
        assert_eq!(transport.chunk_size(0), 1);

        let transport = transport.with_max_calls_per_request(2);
        assert_eq!(transport.chunk_size(5), 2);
    }

    #[tokio::test]
    async fn chunked_results_land_at_their_positions() {
        let asserter = Asserter::new();
        push_aggregate3(
            &asserter,
            vec![IMulticall3::CallResult { success: true, returnData: bytes!("01") }],
        );
        push_aggregate3(
            &asserter,
            vec![IMulticall3::CallResult { success: false, returnData: bytes!("08c379a0") }],
        );
        push_aggregate3(
            &asserter,
            vec![IMulticall3::CallResult { success: true, returnData: bytes!("03") }],
        );

        let transport = mocked_transport(&asserter).with_max_calls_per_request(1);
        let requests = vec![
            balance_of_request(Address::with_last_byte(1)),
            unencodable_request(),
            balance_of_request(Address::with_last_byte(2)),
            unencodable_request(),
            balance_of_request(Address::with_last_byte(3)),
        ];

        let results = transport.execute_batch(1, requests).await.unwrap();
        assert_eq!(
            results,
            vec![
                RawCallResult::succeeded(bytes!("01")),
                RawCallResult::failed(),
                RawCallResult { success: false, output: Some(bytes!("08c379a0")) },
                RawCallResult::failed(),
                RawCallResult::succeeded(bytes!("03")),
            ]
        );
    }

    #[tokio::test]
    async fn single_chunk_without_limit() {
        let asserter = Asserter::new();
        push_aggregate3(
            &asserter,
            vec![
                IMulticall3::CallResult { success: true, returnData: bytes!("01") },
                IMulticall3::CallResult { success: true, returnData: bytes!("02") },
            ],
        );

        let transport = mocked_transport(&asserter).with_max_calls_per_request(0);
        let requests = vec![
            balance_of_request(Address::with_last_byte(1)),
            balance_of_request(Address::with_last_byte(2)),
        ];

        let results = transport.execute_batch(1, requests).await.unwrap();
        assert_eq!(
            results,
            vec![RawCallResult::succeeded(bytes!("01")), RawCallResult::succeeded(bytes!("02"))]
        );
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let asserter = Asserter::new();
        let transport = mocked_transport(&asserter);

        assert_eq!(transport.execute_batch(1, Vec::new()).await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn aggregate3_result_count_is_checked() {
        let asserter = Asserter::new();
        push_aggregate3(
            &asserter,
            vec![
                IMulticall3::CallResult { success: true, returnData: bytes!("01") },
                IMulticall3::CallResult { success: true, returnData: bytes!("02") },
            ],
        );

        let transport = mocked_transport(&asserter);
        let err = transport
            .execute_batch(1, vec![balance_of_request(Address::with_last_byte(1))])
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransportError::ResultCountMismatch { expected: 1, actual: 2 }),
            "{err:?}"
        );
    }
}
