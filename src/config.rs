//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::gemini::GEMINI_API_BASE_URL;
use crate::pipeline::sendgrid::SENDGRID_API_BASE_URL;
use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Reasoning capability configuration
    pub gemini: GeminiConfig,
    /// Delivery capability configuration
    pub sendgrid: SendGridConfig,
    /// Pipeline tunables
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Gemini API configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key; empty when unset
    pub api_key: String,
    /// API base URL
    pub base_url: String,
}

/// SendGrid configuration
#[derive(Clone)]
pub struct SendGridConfig {
    /// API key; `None` disables delivery
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

// Keys stay out of logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key_set", &!self.api_key.is_empty())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key_set", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Read a non-empty environment variable
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset or invalid
fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            server: ServerConfig {
                port: parse_var("PORT", 8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            gemini: GeminiConfig {
                api_key: non_empty_var("GEMINI_API_KEY").unwrap_or_default(),
                base_url: non_empty_var("GEMINI_API_BASE_URL")
                    .unwrap_or_else(|| GEMINI_API_BASE_URL.to_string()),
            },
            sendgrid: SendGridConfig {
                api_key: non_empty_var("SENDGRID_API_KEY"),
                base_url: non_empty_var("SENDGRID_API_BASE_URL")
                    .unwrap_or_else(|| SENDGRID_API_BASE_URL.to_string()),
            },
            pipeline: PipelineConfig {
                num_searches: parse_var("NUM_SEARCHES", defaults.num_searches),
                search_pacing_ms: parse_var("SEARCH_PACING_MS", defaults.search_pacing_ms),
                capability_timeout_secs: parse_var(
                    "CAPABILITY_TIMEOUT_SECS",
                    defaults.capability_timeout_secs,
                ),
                capability_max_attempts: parse_var(
                    "CAPABILITY_MAX_ATTEMPTS",
                    defaults.capability_max_attempts,
                ),
                gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
                max_query_length: parse_var("MAX_QUERY_LENGTH", defaults.max_query_length),
                from_email: non_empty_var("REPORT_FROM_EMAIL").unwrap_or(defaults.from_email),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
