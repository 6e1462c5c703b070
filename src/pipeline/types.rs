//! Pipeline data model
//!
//! Plain data produced once per run and never mutated afterwards.
//! Structured variants serialize with a `status` tag so the HTTP layer can
//! return them as-is.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Maximum query length in characters
pub const MAX_QUERY_LENGTH: usize = 10_000;

/// Errors raised while accepting a submission, before any stage runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Query was empty or whitespace only
    #[error("Query cannot be empty")]
    EmptyQuery,

    /// Query exceeds the configured maximum length
    #[error("Query exceeds maximum length of {max} characters (got {len})")]
    QueryTooLong {
        /// Length of the rejected query in characters
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Recipient was empty or whitespace only
    #[error("Recipient email address cannot be empty")]
    EmptyRecipient,

    /// Recipient failed the minimal syntactic check
    #[error("Invalid recipient email address: {0}")]
    InvalidRecipient(String),
}

/// A research query accepted for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Accept a query, rejecting empty or oversized text
    pub fn new(text: impl Into<String>, max_len: usize) -> Result<Self, SubmissionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SubmissionError::EmptyQuery);
        }
        let len = text.chars().count();
        if len > max_len {
            return Err(SubmissionError::QueryTooLong { len, max: max_len });
        }
        Ok(Self(text))
    }

    /// The query text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Email address a finished report is sent to
///
/// Only a minimal syntactic check is applied: non-empty and containing
/// both `@` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// Parse a recipient address
    pub fn parse(address: impl Into<String>) -> Result<Self, SubmissionError> {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(SubmissionError::EmptyRecipient);
        }
        if !trimmed.contains('@') || !trimmed.contains('.') {
            return Err(SubmissionError::InvalidRecipient(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The address text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One planned search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDirective {
    /// Search term to run
    pub query: String,
    /// Why this search helps answer the query
    #[serde(alias = "reason")]
    pub rationale: String,
}

/// Ordered list of searches produced by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    /// Directives in execution order
    pub searches: Vec<SearchDirective>,
}

impl SearchPlan {
    /// Number of directives
    pub fn len(&self) -> usize {
        self.searches.len()
    }

    /// True if the plan holds no directives
    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}

/// Result of attempting one directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The search produced a summary
    Success {
        /// Condensed search results
        summary: String,
    },
    /// The search failed; the batch continued
    Failed {
        /// Query text of the directive that failed
        directive_query: String,
        /// Human-readable failure reason
        reason: String,
    },
}

impl SearchOutcome {
    /// True for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success { .. })
    }

    /// Text fed to the writer: the summary, or an explicit failure note
    pub fn as_synthesis_input(&self) -> String {
        match self {
            SearchOutcome::Success { summary } => summary.clone(),
            SearchOutcome::Failed {
                directive_query,
                reason,
            } => format!("Search failed for '{}': {}", directive_query, reason),
        }
    }
}

/// The written report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    /// Two or three sentence summary of the findings
    pub short_summary: String,
    /// Full report in markdown
    #[serde(alias = "markdown_report")]
    pub markdown_body: String,
    /// Suggested topics to research further
    #[serde(default, deserialize_with = "null_as_empty")]
    pub follow_up_questions: Vec<String>,
}

// Models sometimes send `null` instead of omitting the field
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// What happened when the report was handed to the delivery capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryResult {
    /// The email was accepted for delivery
    Sent {
        /// Address the report went to
        recipient: String,
    },
    /// Delivery was not attempted
    Skipped {
        /// Why delivery was skipped
        reason: String,
    },
    /// Delivery was attempted and failed
    Failed {
        /// Failure reason
        reason: String,
    },
}

/// Counts of successful searches for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Searches that produced a summary
    pub succeeded: usize,
    /// Searches attempted
    pub total: usize,
}

impl SearchStats {
    /// Tally a set of outcomes
    pub fn from_outcomes(outcomes: &[SearchOutcome]) -> Self {
        Self {
            succeeded: outcomes.iter().filter(|o| o.is_success()).count(),
            total: outcomes.len(),
        }
    }
}

/// Terminal result of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// The written report
    pub report: ReportArtifact,
    /// Delivery outcome
    pub delivery: DeliveryResult,
    /// How many searches succeeded
    pub searches: SearchStats,
}
