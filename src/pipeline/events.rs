//! Pipeline stages and progress events
//!
//! The orchestrator reports every stage transition as a [`PipelineEvent`].
//! Events go to an optional observer channel; a missing or closed observer
//! never affects the run.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// State of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Submission not yet accepted
    Idle,
    /// Generating the search plan
    Planning,
    /// Running searches
    Searching,
    /// Writing the report
    Writing,
    /// Sending the report
    Delivering,
    /// Finished with a report
    Done,
    /// Stopped without a report
    Aborted,
}

impl Stage {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Planning)
                | (Stage::Planning, Stage::Searching)
                | (Stage::Planning, Stage::Aborted)
                | (Stage::Searching, Stage::Writing)
                | (Stage::Writing, Stage::Delivering)
                | (Stage::Writing, Stage::Aborted)
                | (Stage::Delivering, Stage::Done)
        )
    }

    /// True for `Done` and `Aborted`
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Planning => "planning",
            Stage::Searching => "searching",
            Stage::Writing => "writing",
            Stage::Delivering => "delivering",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Progress of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Stage in progress
    Running,
    /// Stage finished normally
    Completed,
    /// Stage degraded or failed
    Error,
}

/// Status update sent to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEvent {
    /// Stage the update is about
    pub stage: Stage,
    /// Stage progress
    pub status: EventStatus,
    /// Human-readable message
    pub message: String,
}

/// Optional sink for progress events
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    /// Sink that drops every event
    pub fn none() -> Self {
        Self::default()
    }

    /// Sink forwarding events to a channel
    pub fn channel(sender: UnboundedSender<PipelineEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Send an event; a closed receiver is ignored
    pub fn emit(&self, stage: Stage, status: EventStatus, message: impl Into<String>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(PipelineEvent {
                stage,
                status,
                message: message.into(),
            });
        }
    }
}
