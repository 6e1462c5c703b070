//! Pipeline utility functions
//!
//! Small helpers for logging and response handling.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Compute a short hash for a query string
///
/// Returns an 8-character hexadecimal hash suitable for logging and tracing,
/// so queries never have to be logged verbatim.
pub fn hash_query(query: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..8].to_string()
}

/// Strip a surrounding markdown code fence from a model response
///
/// Models asked for JSON sometimes wrap it in ```` ```json ... ``` ````.
/// Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
