//! Research pipeline
//!
//! Plan, search, write, deliver. Each stage is a small module built on the
//! [`capability::CapabilityClient`]; [`orchestrator::Orchestrator`] sequences
//! them and decides whether a run continues or aborts.

pub mod capability;
pub mod config;
pub mod delivery;
pub mod events;
pub mod gemini;
pub mod gemini_types;
pub mod orchestrator;
pub mod planner;
pub mod roles;
pub mod search;
pub mod sendgrid;
pub mod types;
pub mod utils;
pub mod writer;

pub use capability::{CapabilityClient, CapabilityError, ReasoningCapability};
pub use delivery::{DeliveryDispatcher, Mailer};
pub use events::{EventSink, PipelineEvent, Stage};
pub use orchestrator::{Orchestrator, PipelineError};
pub use types::{
    DeliveryResult, PipelineResult, Query, Recipient, ReportArtifact, SearchDirective,
    SearchOutcome, SearchPlan, SearchStats, SubmissionError,
};
