//! Transport errors.

use alloy::transports::TransportErrorKind;

/// The round trip carrying a batch could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The RPC request failed (network error, timeout, error response).
    #[error(transparent)]
    Rpc(#[from] alloy::transports::RpcError<TransportErrorKind>),
    /// The `aggregate3` call itself failed or its response could not be decoded.
    #[error(transparent)]
    Contract(#[from] alloy::contract::Error),
    /// The transport answered with a different number of results than requests were sent.
    #[error("expected {expected} results, got {actual}")]
    ResultCountMismatch {
        /// Number of requests sent.
        expected: usize,
        /// Number of results received.
        actual: usize,
    },
}

impl TransportError {
    /// Returns true if the underlying RPC request ran into the [`TimeoutLayer`] deadline.
    ///
    /// [`TimeoutLayer`]: super::TimeoutLayer
    pub fn is_timeout(&self) -> bool {
        let rpc = match self {
            Self::Rpc(err) => Some(err),
            Self::Contract(alloy::contract::Error::TransportError(err)) => Some(err),
            _ => None,
        };
        rpc.and_then(|err| err.as_transport_err())
            .is_some_and(|kind| kind.to_string().starts_with(super::timeout::TIMEOUT_ERROR))
    }
}
