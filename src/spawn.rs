//! Batch caller spawn utilities.
use crate::{
    caller::BatchCaller,
    config::{BatchConfig, ChainConfig},
    constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS},
    registry::BatchCallers,
    transport::{BatchTransport, Multicall3Transport, TimeoutLayer},
};
use alloy::{
    primitives::ChainId,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::ClientBuilder,
    transports::layers::RetryBackoffLayer,
};
use alloy_chains::Chain;
use eyre::{Context, ensure};
use futures_util::future::try_join_all;
use std::{path::Path, sync::Arc};
use tracing::info;

/// Loads the configuration from `config_path` and spawns the batch caller.
pub async fn try_spawn_from_file<P: AsRef<Path>>(config_path: P) -> eyre::Result<BatchCaller> {
    try_spawn(BatchConfig::load_from_file(config_path)?).await
}

/// Connects to every configured chain and spawns one scheduler per chain.
///
/// Fails if an endpoint is unreachable or reports a different chain than it is configured for.
pub async fn try_spawn(config: BatchConfig) -> eyre::Result<BatchCaller> {
    let transports = try_join_all(
        config.chains.iter().map(|(chain, chain_config)| connect_transport(*chain, chain_config)),
    )
    .await?;

    info!(
        chains = transports.len(),
        batch_delay = ?config.batch_delay,
        "Spawning batch schedulers"
    );

    Ok(BatchCaller::new(BatchCallers::spawn(transports, config.batch_delay)))
}

/// Builds the [`Multicall3Transport`] of a chain.
async fn connect_transport(
    chain: Chain,
    config: &ChainConfig,
) -> eyre::Result<(ChainId, Arc<dyn BatchTransport>)> {
    let provider = connect_provider(chain.id(), config).await?;

    let chain_id = provider
        .get_chain_id()
        .await
        .wrap_err_with(|| format!("failed to query chain id of {chain}"))?;
    ensure!(chain_id == chain.id(), "endpoint of {chain} reports chain id {chain_id}");

    info!(
        %chain_id,
        multicall = %config.multicall_address,
        max_calls_per_request = config.max_calls_per_request,
        "Connected to chain"
    );

    let transport = Multicall3Transport::new(provider)
        .with_address(config.multicall_address)
        .with_max_calls_per_request(config.max_calls_per_request);

    Ok((chain_id, Arc::new(transport)))
}

/// Connects to the chain endpoint with retries for rate limited requests and a per-request
/// deadline.
async fn connect_provider(chain_id: ChainId, config: &ChainConfig) -> eyre::Result<DynProvider> {
    let client = ClientBuilder::default()
        .layer(RetryBackoffLayer::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS, u64::MAX))
        .layer(TimeoutLayer::new(config.request_timeout, chain_id))
        .connect(config.endpoint.as_str())
        .await
        .wrap_err_with(|| format!("failed to connect to {}", config.endpoint))?;

    Ok(ProviderBuilder::new().connect_client(client).erased())
}
