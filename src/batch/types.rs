use super::OutcomeSender;
use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, Bytes, ChainId},
};
use std::sync::Arc;
use tokio::{sync::oneshot, time::Instant};

/// A single contract read issued by a caller.
///
/// The target is kept as given by the caller and only validated when the batch is flattened, so
/// that results of a previous lookup can be passed through without checking them first.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Contract address, `0x` prefixed hex.
    pub target: String,
    /// Call arguments. Empty for functions without inputs.
    pub params: Vec<DynSolValue>,
}

impl CallRequest {
    /// Creates a call to `target` without arguments.
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), params: Vec::new() }
    }

    /// Sets the call arguments.
    pub fn with_params(mut self, params: impl IntoIterator<Item = DynSolValue>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    /// Returns the target address if it is well formed.
    pub fn target_address(&self) -> Option<Address> {
        parse_target(&self.target)
    }
}

impl From<Address> for CallRequest {
    fn from(target: Address) -> Self {
        Self::new(target.to_checksum(None))
    }
}

/// Parses a call target.
///
/// A well formed target is `0x` followed by 40 hex digits. All lowercase and all uppercase digits
/// are accepted as is, mixed case must be a valid EIP-55 checksum.
pub fn parse_target(target: &str) -> Option<Address> {
    let digits = target.strip_prefix("0x")?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let mixed_case = digits.bytes().any(|b| b.is_ascii_lowercase())
        && digits.bytes().any(|b| b.is_ascii_uppercase());
    if mixed_case { Address::parse_checksummed(target, None).ok() } else { target.parse().ok() }
}

/// Outcome of a single slot of a [`CallGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call succeeded with the given raw return data.
    Success {
        /// ABI encoded return data.
        output: Bytes,
    },
    /// The slot was empty, its target was malformed or the call reverted.
    Failure,
}

impl CallOutcome {
    /// Returns true for [`CallOutcome::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The raw output of a successful call.
    pub fn output(&self) -> Option<&Bytes> {
        match self {
            Self::Success { output } => Some(output),
            Self::Failure => None,
        }
    }

    /// Consumes the outcome, returning the raw output of a successful call.
    pub fn into_output(self) -> Option<Bytes> {
        match self {
            Self::Success { output } => Some(output),
            Self::Failure => None,
        }
    }
}

/// All calls of a single `call`/`multicall` invocation.
#[derive(Debug)]
pub struct CallGroup {
    /// Chain the calls are made on.
    pub chain_id: ChainId,
    /// Function called on every target of the group.
    pub function: Arc<Function>,
    /// The calls, `None` marking slots that resolve to [`CallOutcome::Failure`] without being
    /// sent.
    pub calls: Vec<Option<CallRequest>>,
    /// Resolved with one [`CallOutcome`] per entry of `calls`.
    pub outcome: OutcomeSender,
}

/// Groups collected by a scheduler during a single window.
#[derive(Debug)]
pub struct PendingBatch {
    chain_id: ChainId,
    groups: Vec<CallGroup>,
    opened_at: Instant,
}

impl PendingBatch {
    /// Opens a batch with its first group.
    pub fn new(first: CallGroup) -> Self {
        Self { chain_id: first.chain_id, groups: vec![first], opened_at: Instant::now() }
    }

    /// Appends a group, preserving arrival order.
    pub fn push(&mut self, group: CallGroup) {
        debug_assert_eq!(group.chain_id, self.chain_id, "group enqueued on the wrong chain");
        self.groups.push(group);
    }

    /// Chain of this batch.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// When the first group arrived.
    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the batch has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of slots across all groups, including empty ones.
    pub fn num_slots(&self) -> usize {
        self.groups.iter().map(|group| group.calls.len()).sum()
    }

    /// The groups in arrival order.
    pub fn groups(&self) -> &[CallGroup] {
        &self.groups
    }

    /// Consumes the batch, returning its groups in arrival order.
    pub fn into_groups(self) -> Vec<CallGroup> {
        self.groups
    }
}

/// Messages for communicating with a [`BatchScheduler`](super::BatchScheduler).
#[derive(Debug)]
pub enum SchedulerMessage {
    /// Add a group to the current window, opening one if needed.
    Enqueue(CallGroup),
    /// Dispatch the current window and stop accepting groups.
    Shutdown {
        /// Notified once the last window has been dispatched.
        response: oneshot::Sender<()>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn parse_target_accepts_well_formed() {
        let expected = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
        assert_eq!(parse_target("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"), Some(expected));
        assert_eq!(parse_target("0xD8DA6BF26964AF9D7EED9E03E53415D37AA96045"), Some(expected));
        assert_eq!(parse_target("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"), Some(expected));
    }

    #[test]
    fn parse_target_rejects_malformed() {
        // missing prefix
        assert_eq!(parse_target("d8da6bf26964af9d7eed9e03e53415d37aa96045"), None);
        // too short
        assert_eq!(parse_target("0xd8da6bf26964af9d7eed9e03e53415d37aa9604"), None);
        // too long
        assert_eq!(parse_target("0xd8da6bf26964af9d7eed9e03e53415d37aa960450"), None);
        // not hex
        assert_eq!(parse_target("0xz8da6bf26964af9d7eed9e03e53415d37aa96045"), None);
        // bad checksum
        assert_eq!(parse_target("0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045"), None);
        assert_eq!(parse_target(""), None);
    }

    #[test]
    fn call_request_from_address_is_well_formed() {
        let target = address!("0000000000000000000000000000000000000001");
        let request = CallRequest::from(target);
        assert_eq!(request.target_address(), Some(target));
        assert!(request.params.is_empty());
    }

    #[test]
    fn outcome_accessors() {
        let success = CallOutcome::Success { output: Bytes::from_static(&[1]) };
        assert!(success.is_success());
        assert_eq!(success.output(), Some(&Bytes::from_static(&[1])));
        assert_eq!(CallOutcome::Failure.into_output(), None);
    }
}
