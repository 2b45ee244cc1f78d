//! Request batching for contract reads.
//!
//! Components:
//! - **BatchScheduler**: one actor per chain, collecting [`CallGroup`]s for a short window and
//!   dispatching them as a single transport round trip
//! - **Dispatch**: flattens a detached [`PendingBatch`] into transport requests and maps the
//!   ordered response back to every group
//! - **Outcome channels**: single use handles resolving each group's outcome list
//!
//! A window opens when a group arrives at an idle scheduler and closes when its timer fires.
//! Groups arriving after that start a new window, even while the previous one is still in
//! flight.

mod dispatch;
mod outcome;
mod scheduler;
mod types;

pub use dispatch::{DispatchPlan, Slot, SlotLayout, demultiplex, flatten};
pub use outcome::{OutcomeReceiver, OutcomeSender, outcome_channel};
pub use scheduler::{BatchScheduler, BatchSchedulerHandle};
pub use types::{
    CallGroup, CallOutcome, CallRequest, PendingBatch, SchedulerMessage, parse_target,
};
