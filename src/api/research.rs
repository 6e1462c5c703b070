//! Research API handlers
//!
//! HTTP entry points for the research pipeline. A run can be awaited as a
//! single JSON response or followed live over SSE (Server-Sent Events).

use crate::error::AppError;
use crate::pipeline::events::EventSink;
use crate::pipeline::orchestrator::PipelineError;
use crate::pipeline::types::{PipelineResult, Query, Recipient, ReportArtifact};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// SSE stream termination signal
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// Helper function to format a stream into SSE (Server-Sent Events) format
///
/// Takes a stream of `Result<String, axum::Error>` and converts it to SSE format
/// where each item is formatted as "data: <content>\n\n"
fn format_sse_stream(
    stream: impl futures_util::Stream<Item = Result<String, axum::Error>> + Send + 'static,
) -> impl futures_util::Stream<Item = Result<String, std::io::Error>> {
    stream.map(|event_result| {
        let sse_text = match event_result {
            Ok(data) => format!("data: {}\n\n", data),
            Err(e) => format!("data: [ERROR] {}\n\n", e),
        };
        Ok::<_, std::io::Error>(sse_text)
    })
}

/// Research request
#[derive(Deserialize, Debug)]
pub struct ResearchRequest {
    /// The research question
    pub query: String,
    /// Where to email the report
    pub recipient: String,
}

/// POST /api/research - Run the pipeline and return the result
///
/// The run is spawned, so a client that disconnects does not cut it short.
///
/// # Returns
/// * `Ok(Json<PipelineResult>)` - The report, delivery status and search counts
/// * `Err(AppError)` - 400 for a rejected submission, 502 if planning or writing aborted
pub async fn research(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<PipelineResult>, AppError> {
    let orchestrator = state.orchestrator();
    let run = tokio::spawn(async move {
        orchestrator
            .submit(&request.query, &request.recipient)
            .await
    });

    let result = run
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Pipeline task failed: {}", e)))??;
    Ok(Json(result))
}

/// POST /api/research/stream - Run the pipeline and stream progress via SSE
///
/// The submission is validated before the stream starts. Each stage
/// transition is sent as a `PipelineEvent` JSON object, followed by a final
/// `result` or `aborted` event and `[DONE]`.
pub async fn research_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Response, AppError> {
    use async_stream::stream;

    let query =
        Query::new(request.query, state.config.max_query_length).map_err(PipelineError::from)?;
    let recipient = Recipient::parse(request.recipient).map_err(PipelineError::from)?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = state.orchestrator().with_events(EventSink::channel(tx));

    // The sender lives in the orchestrator, so the channel closes when the run ends
    let run = tokio::spawn(async move { orchestrator.run(query, recipient).await });

    let stream = stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok::<String, axum::Error>(data),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize pipeline event"),
            }
        }

        let final_event = match run.await {
            Ok(Ok(result)) => json!({"event": "result", "result": result}),
            Ok(Err(e)) => json!({"event": "aborted", "stage": e.stage(), "error": e.to_string()}),
            Err(e) => json!({"event": "aborted", "error": format!("Pipeline task failed: {}", e)}),
        };
        yield Ok::<String, axum::Error>(final_event.to_string());
        yield Ok::<String, axum::Error>(SSE_DONE_SIGNAL.to_string());
    };

    let sse_stream = format_sse_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// POST /api/report/markdown - Export a report's markdown body as a file
///
/// The body is returned verbatim with no further transformation.
pub async fn export_markdown(Json(report): Json<ReportArtifact>) -> Result<Response, AppError> {
    let filename = format!("research_report_{}.md", chrono::Utc::now().timestamp());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(report.markdown_body))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}

/// GET /api/config - Active pipeline configuration
///
/// Secrets are never returned; only whether delivery is configured.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "pipeline": state.config,
        "delivery_configured": state.delivery_configured(),
    }))
}
