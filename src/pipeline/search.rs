//! Search executor
//!
//! Runs each directive of a plan through the `search` role, one at a time and
//! in plan order. A failed search becomes a [`SearchOutcome::Failed`] and the
//! batch carries on, so the output always has one outcome per directive.

use crate::pipeline::capability::CapabilityClient;
use crate::pipeline::events::{EventSink, EventStatus, Stage};
use crate::pipeline::roles::Role;
use crate::pipeline::types::{SearchDirective, SearchOutcome, SearchPlan};
use std::time::Duration;

/// Execute every directive of `plan` sequentially
///
/// `pacing` is slept between consecutive directives, never after the last one.
pub async fn execute(
    client: &CapabilityClient,
    plan: &SearchPlan,
    pacing: Duration,
    events: &EventSink,
) -> Vec<SearchOutcome> {
    let total = plan.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, directive) in plan.searches.iter().enumerate() {
        tracing::info!(
            directive_index = i + 1,
            total = total,
            "Processing search"
        );
        events.emit(
            Stage::Searching,
            EventStatus::Running,
            format!("Processing search {}/{}: {}", i + 1, total, directive.query),
        );

        let outcome = match client
            .invoke(Role::Search, &build_search_input(directive))
            .await
        {
            Ok(output) => SearchOutcome::Success {
                summary: output.into_text(),
            },
            Err(e) => {
                tracing::error!(
                    directive_index = i + 1,
                    error = %e,
                    "Search failed, continuing with remaining searches"
                );
                SearchOutcome::Failed {
                    directive_query: directive.query.clone(),
                    reason: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);

        if i + 1 < total && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }

    outcomes
}

fn build_search_input(directive: &SearchDirective) -> String {
    format!(
        "Search term: {}\nReason for searching: {}",
        directive.query, directive.rationale
    )
}
