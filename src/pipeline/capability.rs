//! Capability client
//!
//! Issues one agent call at a time against a [`ReasoningCapability`] backend.
//! The client resolves the role's instructions and schema from the
//! [`RoleRegistry`], bounds each attempt with a timeout, and validates
//! structured output before handing it back.
//!
//! Retries only happen when the caller configures more than one attempt, and
//! only for [`CapabilityError::Unavailable`].

use crate::pipeline::roles::{OutputSchema, Role, RoleRegistry};
use crate::pipeline::utils::strip_code_fences;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Failure of a single agent call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Network failure, timeout or overloaded backend
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// Output did not match the requested schema
    #[error("Malformed capability output: {0}")]
    MalformedOutput(String),

    /// The capability declined the request (policy, credentials)
    #[error("Capability rejected the request: {0}")]
    Rejected(String),
}

/// One fully resolved request to the reasoning backend
#[derive(Debug, Clone)]
pub struct AgentCall {
    /// Role being invoked
    pub role: Role,
    /// System-level instructions for the role
    pub instructions: String,
    /// Caller payload
    pub input: String,
    /// Required structured output, if any
    pub schema: Option<OutputSchema>,
    /// Ground the call with web search
    pub web_search: bool,
}

/// The external reasoning/generation capability
///
/// Implementations make exactly one outbound call per `generate` and return the
/// raw text produced.
#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Run one call and return the generated text
    async fn generate(&self, call: &AgentCall) -> Result<String, CapabilityError>;
}

/// Output of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Free text (roles without a schema)
    Text(String),
    /// Schema-validated JSON (structured roles)
    Structured(Value),
}

impl AgentOutput {
    /// Text of the output; structured output is rendered as JSON
    pub fn into_text(self) -> String {
        match self {
            AgentOutput::Text(text) => text,
            AgentOutput::Structured(value) => value.to_string(),
        }
    }

    /// Deserialize structured output into a typed value
    pub fn into_structured<T: DeserializeOwned>(self) -> Result<T, CapabilityError> {
        match self {
            AgentOutput::Structured(value) => serde_json::from_value(value)
                .map_err(|e| CapabilityError::MalformedOutput(e.to_string())),
            AgentOutput::Text(_) => Err(CapabilityError::MalformedOutput(
                "expected structured output, got free text".to_string(),
            )),
        }
    }
}

/// Per-run handle for calling roles
#[derive(Clone)]
pub struct CapabilityClient {
    backend: Arc<dyn ReasoningCapability>,
    roles: Arc<RoleRegistry>,
    call_timeout: Duration,
    max_attempts: u32,
}

impl CapabilityClient {
    /// Create a client with a single attempt per call
    pub fn new(
        backend: Arc<dyn ReasoningCapability>,
        roles: Arc<RoleRegistry>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            roles,
            call_timeout,
            max_attempts: 1,
        }
    }

    /// Allow up to `max_attempts` attempts when the backend is unavailable
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Invoke a role with the given input
    ///
    /// # Errors
    /// * `Unavailable` if the backend failed or the call timed out on every attempt
    /// * `MalformedOutput` if a structured role returned output that fails its schema
    /// * `Rejected` if the backend declined the request
    pub async fn invoke(&self, role: Role, input: &str) -> Result<AgentOutput, CapabilityError> {
        let config = self.roles.get(role);
        let call = AgentCall {
            role,
            instructions: config.instructions.clone(),
            input: input.to_string(),
            schema: config.schema,
            web_search: config.web_search,
        };

        let mut attempt = 1;
        let text = loop {
            tracing::debug!(
                role = %role,
                agent = config.name,
                attempt = attempt,
                input_len = input.len(),
                "Invoking capability"
            );

            let result = match timeout(self.call_timeout, self.backend.generate(&call)).await {
                Ok(result) => result,
                Err(_) => Err(CapabilityError::Unavailable(format!(
                    "call timed out after {} seconds",
                    self.call_timeout.as_secs_f64()
                ))),
            };

            match result {
                Ok(text) => break text,
                Err(CapabilityError::Unavailable(reason)) if attempt < self.max_attempts => {
                    tracing::warn!(
                        role = %role,
                        attempt = attempt,
                        error = %reason,
                        "Capability unavailable, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(role = %role, attempt = attempt, error = %e, "Capability call failed");
                    return Err(e);
                }
            }
        };

        match call.schema {
            None => Ok(AgentOutput::Text(text)),
            Some(schema) => {
                let value: Value = serde_json::from_str(strip_code_fences(&text)).map_err(|e| {
                    CapabilityError::MalformedOutput(format!(
                        "response from {} is not valid JSON: {}",
                        role, e
                    ))
                })?;
                schema.validate(&value).map_err(|reason| {
                    CapabilityError::MalformedOutput(format!(
                        "response from {} does not match schema: {}",
                        role, reason
                    ))
                })?;
                Ok(AgentOutput::Structured(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Backend that replays scripted responses and records every call
    struct Scripted {
        responses: Mutex<Vec<Result<String, CapabilityError>>>,
        calls: Mutex<Vec<AgentCall>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, CapabilityError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReasoningCapability for Scripted {
        async fn generate(&self, call: &AgentCall) -> Result<String, CapabilityError> {
            self.calls.lock().unwrap().push(call.clone());
            self.responses.lock().unwrap().remove(0)
        }
    }

    struct Stalled;

    #[async_trait]
    impl ReasoningCapability for Stalled {
        async fn generate(&self, _call: &AgentCall) -> Result<String, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn client(backend: Arc<dyn ReasoningCapability>) -> CapabilityClient {
        CapabilityClient::new(
            backend,
            Arc::new(RoleRegistry::new(2)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_text_role_returns_text() {
        let backend = Scripted::new(vec![Ok("summary".to_string())]);
        let output = client(backend.clone())
            .invoke(Role::Search, "Search term: rust")
            .await
            .unwrap();
        assert_eq!(output, AgentOutput::Text("summary".to_string()));

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].role, Role::Search);
        assert!(calls[0].web_search);
        assert_eq!(calls[0].input, "Search term: rust");
    }

    #[tokio::test]
    async fn test_structured_role_validates_and_strips_fences() {
        let backend = Scripted::new(vec![Ok(
            "```json\n{\"searches\": [{\"query\": \"a\", \"reason\": \"r\"}, {\"query\": \"b\", \"reason\": \"r\"}]}\n```"
                .to_string(),
        )]);
        let output = client(backend).invoke(Role::Planner, "Query: x").await.unwrap();
        assert!(matches!(output, AgentOutput::Structured(_)));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_malformed() {
        let backend = Scripted::new(vec![Ok(r#"{"searches": []}"#.to_string())]);
        let err = client(backend)
            .invoke(Role::Planner, "Query: x")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MalformedOutput(_)));
        assert!(err.to_string().contains("exactly 2"));
    }

    #[tokio::test]
    async fn test_non_json_is_malformed() {
        let backend = Scripted::new(vec![Ok("Sure! Here is your plan".to_string())]);
        let err = client(backend)
            .invoke(Role::Writer, "payload")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let backend = Scripted::new(vec![
            Err(CapabilityError::Unavailable("down".to_string())),
            Ok("never used".to_string()),
        ]);
        let err = client(backend.clone())
            .invoke(Role::Search, "x")
            .await
            .unwrap_err();
        assert_eq!(err, CapabilityError::Unavailable("down".to_string()));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_unavailable_when_configured() {
        let backend = Scripted::new(vec![
            Err(CapabilityError::Unavailable("down".to_string())),
            Ok("summary".to_string()),
        ]);
        let output = client(backend.clone())
            .with_max_attempts(3)
            .invoke(Role::Search, "x")
            .await
            .unwrap();
        assert_eq!(output.into_text(), "summary");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_is_not_retried() {
        let backend = Scripted::new(vec![
            Err(CapabilityError::Rejected("policy".to_string())),
            Ok("never used".to_string()),
        ]);
        let err = client(backend.clone())
            .with_max_attempts(3)
            .invoke(Role::Search, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Rejected(_)));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_times_out_as_unavailable() {
        let err = client(Arc::new(Stalled))
            .invoke(Role::Search, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_into_structured_rejects_text() {
        let err = AgentOutput::Text("x".to_string())
            .into_structured::<Value>()
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MalformedOutput(_)));
    }
}
