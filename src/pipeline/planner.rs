//! Search planner
//!
//! Asks the `planner` role for a fixed-length list of searches. Planning is
//! all-or-nothing: a plan either has exactly the configured number of
//! directives or the stage fails.

use crate::pipeline::capability::{CapabilityClient, CapabilityError};
use crate::pipeline::roles::Role;
use crate::pipeline::types::{Query, SearchPlan};
use crate::pipeline::utils::hash_query;
use thiserror::Error;

/// Planning stage failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The planner call failed or returned an unusable plan
    #[error("Planning failed: {0}")]
    CapabilityFailure(#[from] CapabilityError),
}

/// Produce the search plan for a query
///
/// # Errors
/// * `PlanError::CapabilityFailure` if the call fails or the output does not
///   hold exactly the configured number of searches
pub async fn plan(client: &CapabilityClient, query: &Query) -> Result<SearchPlan, PlanError> {
    let input = build_planner_input(query);

    tracing::debug!(
        query_hash = %hash_query(query.as_str()),
        "Calling planner agent to generate search plan"
    );

    let plan: SearchPlan = client
        .invoke(Role::Planner, &input)
        .await?
        .into_structured()?;

    tracing::info!(
        query_hash = %hash_query(query.as_str()),
        num_searches = plan.len(),
        "Planned searches"
    );

    Ok(plan)
}

fn build_planner_input(query: &Query) -> String {
    format!("Query: {}", query)
}
