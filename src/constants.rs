//! Batch caller constants.

use std::time::Duration;

/// How long a scheduler keeps accepting calls after the first call of a window arrived.
///
/// Short enough to keep caller latency low, long enough to merge calls that are issued in
/// quick succession (eg. `try_join_all` over several balance lookups).
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(10);

/// Maximum number of calls sent in a single `aggregate3` request.
///
/// Larger windows are split into several concurrent requests by the transport.
pub const DEFAULT_MAX_CALLS_PER_REQUEST: usize = 500;

/// Default deadline for a single RPC request issued by the transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retries for rate limited RPC requests.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Initial backoff between retries of rate limited RPC requests, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 800;
