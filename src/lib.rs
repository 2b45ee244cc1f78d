//! # Batch Caller
//!
//! Coalesces contract reads issued concurrently on the same chain into a single Multicall3
//! round trip, and maps the response back to every caller.

pub mod batch;
pub mod caller;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod serde;
pub mod spawn;
pub mod transport;

pub use batch::{CallOutcome, CallRequest};
pub use caller::{BatchCaller, MulticallResult};
pub use error::CallError;
pub use registry::BatchCallers;
