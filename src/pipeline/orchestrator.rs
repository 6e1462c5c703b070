//! Pipeline orchestrator
//!
//! Owns the run state machine:
//!
//! ```text
//! Idle -> Planning -> Searching -> Writing -> Delivering -> Done
//!            |                        |
//!            +--------> Aborted <-----+
//! ```
//!
//! Stages run strictly one after another. Planning and writing failures abort
//! the run with their cause; search failures become placeholders and delivery
//! problems are attached to the result as data.

use crate::pipeline::capability::CapabilityClient;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::delivery::DeliveryDispatcher;
use crate::pipeline::events::{EventSink, EventStatus, Stage};
use crate::pipeline::planner::{self, PlanError};
use crate::pipeline::search;
use crate::pipeline::types::{
    DeliveryResult, PipelineResult, Query, Recipient, SearchStats, SubmissionError,
};
use crate::pipeline::utils::hash_query;
use crate::pipeline::writer::{self, SynthesisError};
use std::time::Duration;
use thiserror::Error;

/// Why a run did not reach `Done`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Submission rejected before planning started
    #[error(transparent)]
    InvalidSubmission(#[from] SubmissionError),

    /// Planning failed; no report was produced
    #[error(transparent)]
    Planning(#[from] PlanError),

    /// Writing failed; no report was produced
    #[error(transparent)]
    Writing(#[from] SynthesisError),
}

impl PipelineError {
    /// Stage the run was in when it stopped
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidSubmission(_) => Stage::Idle,
            PipelineError::Planning(_) => Stage::Planning,
            PipelineError::Writing(_) => Stage::Writing,
        }
    }
}

/// Tracks the current stage of one run
struct RunState<'a> {
    stage: Stage,
    events: &'a EventSink,
    query_hash: String,
}

impl<'a> RunState<'a> {
    fn advance(&mut self, next: Stage, message: &str) {
        debug_assert!(!self.stage.is_terminal(), "run already ended in {}", self.stage);
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid transition {} -> {}",
            self.stage,
            next
        );
        tracing::info!(
            query_hash = %self.query_hash,
            from = %self.stage,
            to = %next,
            "Pipeline stage transition"
        );
        self.stage = next;

        let status = match next {
            Stage::Done => EventStatus::Completed,
            Stage::Aborted => EventStatus::Error,
            _ => EventStatus::Running,
        };
        self.events.emit(next, status, message);
    }
}

/// Runs the research pipeline end to end
///
/// Each orchestrator owns its own capability client handle and keeps no
/// state between runs.
#[derive(Clone)]
pub struct Orchestrator {
    client: CapabilityClient,
    dispatcher: DeliveryDispatcher,
    pacing: Duration,
    max_query_length: usize,
    events: EventSink,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators and configuration
    pub fn new(
        client: CapabilityClient,
        dispatcher: DeliveryDispatcher,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            client,
            dispatcher,
            pacing: config.search_pacing(),
            max_query_length: config.max_query_length,
            events: EventSink::none(),
        }
    }

    /// Report progress events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Validate a raw submission and run the pipeline
    ///
    /// # Errors
    /// * `InvalidSubmission` if the query or recipient is rejected; no stage runs
    /// * `Planning` / `Writing` if the run aborted in that stage
    pub async fn submit(
        &self,
        query: &str,
        recipient: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let query = Query::new(query, self.max_query_length)?;
        let recipient = Recipient::parse(recipient)?;
        self.run(query, recipient).await
    }

    /// Run all stages for an accepted submission
    ///
    /// # Errors
    /// * `Planning` if the planner failed
    /// * `Writing` if the writer failed
    pub async fn run(
        &self,
        query: Query,
        recipient: Recipient,
    ) -> Result<PipelineResult, PipelineError> {
        let mut state = RunState {
            stage: Stage::Idle,
            events: &self.events,
            query_hash: hash_query(query.as_str()),
        };

        // Planning
        state.advance(Stage::Planning, "Planning searches...");
        let plan = match planner::plan(&self.client, &query).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(query_hash = %state.query_hash, error = %e, "Planning failed, aborting run");
                state.advance(Stage::Aborted, &e.to_string());
                return Err(e.into());
            }
        };
        self.events.emit(
            Stage::Planning,
            EventStatus::Completed,
            format!("Search plan created: {} searches", plan.len()),
        );

        // Searching
        state.advance(Stage::Searching, "Performing web searches...");
        let outcomes = search::execute(&self.client, &plan, self.pacing, &self.events).await;
        let searches = SearchStats::from_outcomes(&outcomes);
        tracing::info!(
            query_hash = %state.query_hash,
            succeeded = searches.succeeded,
            total = searches.total,
            "Completed all web searches"
        );
        self.events.emit(
            Stage::Searching,
            if searches.total > 0 && searches.succeeded == 0 {
                EventStatus::Error
            } else {
                EventStatus::Completed
            },
            format!(
                "Completed {}/{} searches successfully",
                searches.succeeded, searches.total
            ),
        );

        // Writing
        state.advance(Stage::Writing, "Writing comprehensive report...");
        let report = match writer::synthesize(&self.client, &query, &outcomes).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(query_hash = %state.query_hash, error = %e, "Report writing failed, aborting run");
                state.advance(Stage::Aborted, &e.to_string());
                return Err(e.into());
            }
        };
        self.events
            .emit(Stage::Writing, EventStatus::Completed, "Report generated");

        // Delivering
        state.advance(Stage::Delivering, "Sending email...");
        let delivery = self
            .dispatcher
            .deliver(&self.client, &report, &recipient)
            .await;
        let (status, message) = match &delivery {
            DeliveryResult::Sent { recipient } => {
                (EventStatus::Completed, format!("Report sent to {}", recipient))
            }
            DeliveryResult::Skipped { reason } => {
                (EventStatus::Error, format!("Email skipped: {}", reason))
            }
            DeliveryResult::Failed { reason } => {
                (EventStatus::Error, format!("Email failed: {}", reason))
            }
        };
        self.events.emit(Stage::Delivering, status, message);

        state.advance(Stage::Done, "Research completed");

        Ok(PipelineResult {
            report,
            delivery,
            searches,
        })
    }
}
