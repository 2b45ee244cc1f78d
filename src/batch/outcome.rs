use super::CallOutcome;
use crate::error::CallError;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

type OutcomeResult = Result<Vec<CallOutcome>, CallError>;

/// Creates a single use channel resolving the outcomes of one [`CallGroup`](super::CallGroup).
pub fn outcome_channel() -> (OutcomeSender, OutcomeReceiver) {
    let (tx, rx) = oneshot::channel();
    (OutcomeSender(tx), OutcomeReceiver(rx))
}

/// Producing half of an outcome channel.
///
/// Both [`fulfill`](Self::fulfill) and [`fail`](Self::fail) consume the sender, so a channel is
/// resolved at most once.
#[derive(Debug)]
pub struct OutcomeSender(oneshot::Sender<OutcomeResult>);

impl OutcomeSender {
    /// Resolves the channel with one outcome per slot.
    ///
    /// The value is discarded if the caller stopped waiting.
    pub fn fulfill(self, outcomes: Vec<CallOutcome>) {
        let _ = self.0.send(Ok(outcomes));
    }

    /// Rejects the channel.
    pub fn fail(self, err: CallError) {
        let _ = self.0.send(Err(err));
    }

    /// Returns true if the caller dropped the receiving half.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Consuming half of an outcome channel.
///
/// Resolves to [`CallError::SchedulerClosed`] if the sender is dropped without being resolved.
#[derive(Debug)]
#[must_use = "outcomes are only observed by awaiting the receiver"]
pub struct OutcomeReceiver(oneshot::Receiver<OutcomeResult>);

impl Future for OutcomeReceiver {
    type Output = OutcomeResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(CallError::SchedulerClosed)))
    }
}
