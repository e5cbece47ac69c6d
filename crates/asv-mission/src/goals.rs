//! Seams to the motion subsystems and status consumers.

use asv_proto::goal::{GoalHandle, GoalKind};
use asv_proto::status::StatusEvent;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind:?} goal server not responding: {reason}")]
pub struct GoalError {
    pub kind: GoalKind,
    pub reason: String,
}

impl GoalError {
    pub fn new(kind: GoalKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into() }
    }
}

/// A long-running, cancellable goal interface.
///
/// `send` returns once the goal is handed over; the terminal outcome comes
/// back later as [`MissionEvent::GoalDone`](crate::MissionEvent::GoalDone)
/// carrying the same handle. Sending while a goal is active supersedes it.
pub trait GoalClient<G>: Send {
    fn send(&mut self, handle: GoalHandle, goal: G) -> Result<(), GoalError>;
    fn cancel(&mut self, handle: GoalHandle) -> Result<(), GoalError>;
}

/// Receives heartbeats and other status outputs of the mission core.
pub trait StatusSink: Send {
    fn publish(&mut self, event: StatusEvent);
}

impl StatusSink for mpsc::UnboundedSender<StatusEvent> {
    fn publish(&mut self, event: StatusEvent) {
        // a closed receiver just means nobody is listening
        let _ = self.send(event);
    }
}
