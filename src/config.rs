//! Batch caller configuration.
use crate::constants::{
    DEFAULT_BATCH_DELAY, DEFAULT_MAX_CALLS_PER_REQUEST, DEFAULT_REQUEST_TIMEOUT,
};
use alloy::{
    primitives::{Address, map::HashMap},
    providers::MULTICALL3_ADDRESS,
};
use alloy_chains::Chain;
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

/// Batch caller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// How long a window stays open after its first call arrived, in milliseconds.
    #[serde(with = "crate::serde::duration::millis", default = "default_batch_delay")]
    pub batch_delay: Duration,
    /// Chain configurations.
    #[serde(with = "crate::serde::hash_map", default)]
    pub chains: HashMap<Chain, ChainConfig>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { batch_delay: DEFAULT_BATCH_DELAY, chains: HashMap::default() }
    }
}

impl BatchConfig {
    /// Sets the batch window.
    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// Adds or replaces the configuration of `chain`.
    pub fn with_chain(mut self, chain: Chain, config: ChainConfig) -> Self {
        self.chains.insert(chain, config);
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Chain specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The RPC endpoint of the chain.
    pub endpoint: Url,
    /// The Multicall3 deployment. Defaults to the canonical address.
    #[serde(default = "default_multicall_address")]
    pub multicall_address: Address,
    /// Maximum number of calls per `aggregate3` request, zero for no limit.
    #[serde(default = "default_max_calls_per_request")]
    pub max_calls_per_request: usize,
    /// Deadline of a single RPC request, in seconds.
    #[serde(with = "crate::serde::duration::secs", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl ChainConfig {
    /// Creates a configuration for `endpoint` with default settings.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            multicall_address: MULTICALL3_ADDRESS,
            max_calls_per_request: DEFAULT_MAX_CALLS_PER_REQUEST,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the Multicall3 deployment.
    pub fn with_multicall_address(mut self, address: Address) -> Self {
        self.multicall_address = address;
        self
    }

    /// Sets the maximum number of calls per `aggregate3` request.
    pub fn with_max_calls_per_request(mut self, max_calls_per_request: usize) -> Self {
        self.max_calls_per_request = max_calls_per_request;
        self
    }

    /// Sets the request deadline.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

const fn default_batch_delay() -> Duration {
    DEFAULT_BATCH_DELAY
}

const fn default_multicall_address() -> Address {
    MULTICALL3_ADDRESS
}

const fn default_max_calls_per_request() -> usize {
    DEFAULT_MAX_CALLS_PER_REQUEST
}

const fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
