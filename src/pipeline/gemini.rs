//! Gemini API backend
//!
//! Direct HTTP client for the Gemini `generateContent` endpoint, used as the
//! pipeline's reasoning capability. Role instructions go in the system
//! instruction, the caller payload is the single user turn.

use crate::pipeline::capability::{AgentCall, CapabilityError, ReasoningCapability};
use crate::pipeline::gemini_types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, GoogleSearch, RequestContent,
    RequestPart, Tool,
};
use async_trait::async_trait;

/// Default Gemini REST endpoint
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the model refused to answer
const REFUSAL_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "RECITATION",
];

/// Reasoning capability backed by the Gemini API
#[derive(Clone)]
pub struct GeminiCapability {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCapability {
    /// Create a backend against the public Gemini endpoint
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Point the backend at a different base URL (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(call: &AgentCall) -> GeminiApiRequest {
        let generation_config = call.schema.map(|schema| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema.response_schema()),
        });

        let tools = if call.web_search {
            vec![Tool {
                google_search: GoogleSearch::default(),
            }]
        } else {
            Vec::new()
        };

        GeminiApiRequest {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: call.instructions.clone(),
                }],
            },
            contents: vec![RequestContent {
                role: Some("user".to_string()),
                parts: vec![RequestPart {
                    text: call.input.clone(),
                }],
            }],
            tools,
            generation_config,
        }
    }
}

#[async_trait]
impl ReasoningCapability for GeminiCapability {
    async fn generate(&self, call: &AgentCall) -> Result<String, CapabilityError> {
        if self.api_key.is_empty() {
            return Err(CapabilityError::Rejected("API key is empty".to_string()));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request_body = Self::build_request(call);

        tracing::debug!(
            url = %url,
            model = %self.model,
            role = %call.role,
            structured = call.schema.is_some(),
            web_search = call.web_search,
            input_len = call.input.len(),
            "Calling Gemini API"
        );

        // Make POST request using shared client (connection pooling)
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                CapabilityError::Unavailable(format!(
                    "Failed to send HTTP request to Gemini API: {}",
                    e
                ))
            })?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(CapabilityError::Unavailable(format!(
                    "Gemini API rate limit exceeded (HTTP {}): {}",
                    status_code, error_body
                )));
            }
            if status_code == 408 || status.is_server_error() {
                return Err(CapabilityError::Unavailable(format!(
                    "Gemini API returned error status {}: {}",
                    status_code, error_body
                )));
            }
            return Err(CapabilityError::Rejected(format!(
                "Gemini API returned error status {}: {}",
                status_code, error_body
            )));
        }

        let response_body = response.text().await.map_err(|e| {
            CapabilityError::Unavailable(format!(
                "Failed to read response body from Gemini API: {}",
                e
            ))
        })?;

        let parsed: GeminiApiResponse = serde_json::from_str(&response_body).map_err(|e| {
            CapabilityError::MalformedOutput(format!(
                "Failed to parse JSON response from Gemini API: {}",
                e
            ))
        })?;

        // Check for blocked prompt
        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_ref())
        {
            return Err(CapabilityError::Rejected(format!(
                "Gemini API blocked the prompt: {}",
                reason
            )));
        }

        let candidate = parsed.candidates.first().ok_or_else(|| {
            CapabilityError::MalformedOutput("Gemini API response contains no candidates".to_string())
        })?;

        // Grounded answers may be split over several text parts
        let text: String = candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            if let Some(reason) = candidate
                .finish_reason
                .as_deref()
                .filter(|reason| REFUSAL_FINISH_REASONS.contains(reason))
            {
                return Err(CapabilityError::Rejected(format!(
                    "Gemini API stopped generation: {}",
                    reason
                )));
            }
            return Err(CapabilityError::MalformedOutput(
                "Gemini API response text is empty".to_string(),
            ));
        }

        tracing::debug!(
            role = %call.role,
            response_len = text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(text)
    }
}
