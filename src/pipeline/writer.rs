//! Report synthesizer
//!
//! Reduces the query and every search outcome into one report through the
//! `writer` role. Failed searches are passed through as explicit notes so the
//! writer knows where the gaps are.

use crate::pipeline::capability::{CapabilityClient, CapabilityError};
use crate::pipeline::roles::Role;
use crate::pipeline::types::{Query, ReportArtifact, SearchOutcome};
use thiserror::Error;

/// Writing stage failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// The writer call failed or returned an unusable report
    #[error("Report writing failed: {0}")]
    CapabilityFailure(#[from] CapabilityError),
}

/// Write the report for `query` from all search outcomes
///
/// # Errors
/// * `SynthesisError::CapabilityFailure` if the call fails or the output does
///   not match the report schema
pub async fn synthesize(
    client: &CapabilityClient,
    query: &Query,
    outcomes: &[SearchOutcome],
) -> Result<ReportArtifact, SynthesisError> {
    let input = build_writer_input(query, outcomes);

    tracing::info!(
        num_outcomes = outcomes.len(),
        input_len = input.len(),
        "Writing report"
    );

    let report: ReportArtifact = client
        .invoke(Role::Writer, &input)
        .await?
        .into_structured()?;

    tracing::info!(
        summary_len = report.short_summary.len(),
        report_len = report.markdown_body.len(),
        follow_ups = report.follow_up_questions.len(),
        "Report writing completed"
    );

    Ok(report)
}

fn build_writer_input(query: &Query, outcomes: &[SearchOutcome]) -> String {
    let mut input = format!("Original query: {}\nSummarized search results:\n", query);
    for (i, outcome) in outcomes.iter().enumerate() {
        input.push_str(&format!("\n[{}] {}\n", i + 1, outcome.as_synthesis_input()));
    }
    input
}
