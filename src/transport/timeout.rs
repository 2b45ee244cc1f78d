//! Per-request deadline for the RPC client backing a transport.
//!
//! The scheduler imposes no deadline of its own, so a hung endpoint would otherwise stall every
//! caller of a window.

use alloy::{
    primitives::ChainId,
    rpc::json_rpc::{RequestPacket, ResponsePacket},
    transports::{Transport, TransportError, TransportErrorKind, TransportFut},
};
use futures::FutureExt;
use itertools::Itertools;
use std::{
    task::{Context, Poll},
    time::Duration,
};
use tower::{Layer, Service};
use tracing::warn;

/// Prefix of the error message of timed out requests.
pub(crate) const TIMEOUT_ERROR: &str = "request timeout";

/// A [`tower::Layer`] failing RPC requests that take longer than a fixed deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
    chain_id: ChainId,
}

impl TimeoutLayer {
    /// Creates a new [`TimeoutLayer`] for the client of `chain_id`.
    pub const fn new(timeout: Duration, chain_id: ChainId) -> Self {
        Self { timeout, chain_id }
    }
}

impl<T> Layer<T> for TimeoutLayer {
    type Service = TimeoutService<T>;

    fn layer(&self, inner: T) -> Self::Service {
        TimeoutService { inner, timeout: self.timeout, chain_id: self.chain_id }
    }
}

/// Service produced by [`TimeoutLayer`].
#[derive(Debug, Clone)]
pub struct TimeoutService<T> {
    inner: T,
    timeout: Duration,
    chain_id: ChainId,
}

impl<T> Service<RequestPacket> for TimeoutService<T>
where
    T: Transport + Clone,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let methods = match &req {
            RequestPacket::Single(req) => req.method().to_string(),
            RequestPacket::Batch(reqs) => reqs.iter().map(|req| req.method()).join(","),
        };
        let fut = self.inner.call(req);
        let Self { timeout, chain_id, .. } = *self;

        async move {
            tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
                warn!(
                    %chain_id,
                    %methods,
                    timeout_ms = timeout.as_millis() as u64,
                    "RPC request timed out"
                );
                Err(TransportErrorKind::custom_str(&format!(
                    "{TIMEOUT_ERROR}: chain_id={chain_id}, methods={methods}"
                )))
            })
        }
        .boxed()
    }
}
