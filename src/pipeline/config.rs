//! Pipeline configuration
//!
//! Tunables for a research run. Secrets are not part of this struct; only
//! whether a delivery credential exists is reported.

use crate::pipeline::types::MAX_QUERY_LENGTH;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Number of searches the planner must produce
    pub num_searches: usize,
    /// Delay between consecutive searches in milliseconds
    pub search_pacing_ms: u64,
    /// Per-call deadline in seconds
    pub capability_timeout_secs: u64,
    /// Attempts per capability call (retries only when unavailable)
    pub capability_max_attempts: u32,
    /// Gemini model name
    pub gemini_model: String,
    /// Maximum query length in characters
    pub max_query_length: usize,
    /// Sender address for report emails
    pub from_email: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_searches: 5,
            search_pacing_ms: 1000,
            capability_timeout_secs: 60,
            capability_max_attempts: 1,
            gemini_model: "gemini-2.5-flash".to_string(),
            max_query_length: MAX_QUERY_LENGTH,
            from_email: "research-assistant@example.com".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Pacing delay between searches
    pub fn search_pacing(&self) -> Duration {
        Duration::from_millis(self.search_pacing_ms)
    }

    /// Deadline for a single capability call
    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// * `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capability_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "capability_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.capability_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "capability_max_attempts must be > 0".to_string(),
            ));
        }
        if self.gemini_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "gemini_model cannot be empty".to_string(),
            ));
        }
        if self.max_query_length == 0 {
            return Err(ConfigError::Invalid(
                "max_query_length must be > 0".to_string(),
            ));
        }
        if self.from_email.trim().is_empty() {
            return Err(ConfigError::Invalid("from_email cannot be empty".to_string()));
        }
        Ok(())
    }
}
