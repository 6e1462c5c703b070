//! Delivery dispatcher
//!
//! Hands a finished report to the delivery capability. The `delivery-agent`
//! role drafts the email (subject + HTML body) and the configured [`Mailer`]
//! sends it once, to one recipient. Every failure is reported as a
//! [`DeliveryResult`], never as an error: a written report stays valid even
//! when today's delivery did not go out.

use crate::pipeline::capability::{CapabilityClient, CapabilityError};
use crate::pipeline::roles::Role;
use crate::pipeline::types::{DeliveryResult, Recipient, ReportArtifact};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Reason recorded when no mailer credential is configured
pub const MISSING_CREDENTIAL: &str = "missing credential";

/// Deadline for one send unless configured otherwise
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Email drafted by the delivery agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Email handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Errors from the email transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailerError {
    /// The request never reached the provider or the response was lost
    #[error("Email transport failed: {0}")]
    Transport(String),

    /// The provider refused the message
    #[error("Email provider returned status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// The external delivery capability
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// Sends reports through the delivery agent and a mailer
#[derive(Clone)]
pub struct DeliveryDispatcher {
    mailer: Option<Arc<dyn Mailer>>,
    send_timeout: Duration,
}

impl DeliveryDispatcher {
    /// Create a dispatcher; `None` means no credential is configured
    pub fn new(mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self {
            mailer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Bound each send by `send_timeout`
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Whether a delivery credential is configured
    pub fn is_configured(&self) -> bool {
        self.mailer.is_some()
    }

    /// Deliver `report` to `recipient`
    ///
    /// Makes at most one send attempt. Returns `Skipped` without any call when
    /// no mailer is configured.
    pub async fn deliver(
        &self,
        client: &CapabilityClient,
        report: &ReportArtifact,
        recipient: &Recipient,
    ) -> DeliveryResult {
        let Some(mailer) = &self.mailer else {
            tracing::warn!("No delivery credential configured, skipping email");
            return DeliveryResult::Skipped {
                reason: MISSING_CREDENTIAL.to_string(),
            };
        };

        let draft = match draft_email(client, report, recipient).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::error!(error = %e, "Delivery agent failed to draft email");
                return DeliveryResult::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let email = OutgoingEmail {
            to: recipient.as_str().to_string(),
            subject: draft.subject,
            html_body: draft.html_body,
        };

        tracing::info!(
            subject_len = email.subject.len(),
            body_len = email.html_body.len(),
            "Sending report email"
        );

        match timeout(self.send_timeout, mailer.send(&email)).await {
            Ok(Ok(())) => DeliveryResult::Sent {
                recipient: email.to,
            },
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Email sending failed");
                DeliveryResult::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = self.send_timeout.as_secs_f64(),
                    "Email sending timed out"
                );
                DeliveryResult::Failed {
                    reason: format!(
                        "Email transport timed out after {} seconds",
                        self.send_timeout.as_secs_f64()
                    ),
                }
            }
        }
    }
}

async fn draft_email(
    client: &CapabilityClient,
    report: &ReportArtifact,
    recipient: &Recipient,
) -> Result<EmailDraft, CapabilityError> {
    let input = format!(
        "Recipient: {}\nShort summary: {}\n\nReport (markdown):\n\n{}",
        recipient, report.short_summary, report.markdown_body
    );
    client
        .invoke(Role::DeliveryAgent, &input)
        .await?
        .into_structured()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::capability::{AgentCall, ReasoningCapability};
    use crate::pipeline::roles::RoleRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Drafter {
        response: Result<String, CapabilityError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningCapability for Drafter {
        async fn generate(&self, call: &AgentCall) -> Result<String, CapabilityError> {
            assert_eq!(call.role, Role::DeliveryAgent);
            assert!(call.input.contains("Recipient: a@b.com"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        fail: bool,
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
            self.sent.lock().unwrap().push(email.clone());
            if self.fail {
                Err(MailerError::Rejected {
                    status: 401,
                    body: "bad key".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn client(response: Result<String, CapabilityError>) -> (CapabilityClient, Arc<Drafter>) {
        let backend = Arc::new(Drafter {
            response,
            calls: AtomicUsize::new(0),
        });
        let client = CapabilityClient::new(
            backend.clone(),
            Arc::new(RoleRegistry::new(5)),
            Duration::from_secs(5),
        );
        (client, backend)
    }

    fn report() -> ReportArtifact {
        ReportArtifact {
            short_summary: "Agents are everywhere.".to_string(),
            markdown_body: "# Agents".to_string(),
            follow_up_questions: vec![],
        }
    }

    fn recipient() -> Recipient {
        Recipient::parse("a@b.com").unwrap()
    }

    const DRAFT: &str = r#"{"subject": "AI agents in 2025", "html_body": "<h1>Agents</h1>"}"#;

    #[tokio::test]
    async fn test_missing_credential_skips_without_calls() {
        let (client, backend) = client(Ok(DRAFT.to_string()));
        let result = DeliveryDispatcher::new(None)
            .deliver(&client, &report(), &recipient())
            .await;

        assert_eq!(
            result,
            DeliveryResult::Skipped {
                reason: "missing credential".to_string()
            }
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sends_drafted_email_once() {
        let (client, _) = client(Ok(DRAFT.to_string()));
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = DeliveryDispatcher::new(Some(mailer.clone()));
        assert!(dispatcher.is_configured());

        let result = dispatcher.deliver(&client, &report(), &recipient()).await;

        assert_eq!(
            result,
            DeliveryResult::Sent {
                recipient: "a@b.com".to_string()
            }
        );
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.com");
        assert_eq!(sent[0].subject, "AI agents in 2025");
        assert_eq!(sent[0].html_body, "<h1>Agents</h1>");
    }

    #[tokio::test]
    async fn test_draft_failure_is_reported_not_sent() {
        let (client, _) = client(Err(CapabilityError::Unavailable("timeout".to_string())));
        let mailer = Arc::new(RecordingMailer::default());

        let result = DeliveryDispatcher::new(Some(mailer.clone()))
            .deliver(&client, &report(), &recipient())
            .await;

        assert!(matches!(result, DeliveryResult::Failed { .. }));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let (client, _) = client(Ok(DRAFT.to_string()));
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });

        let result = DeliveryDispatcher::new(Some(mailer.clone()))
            .deliver(&client, &report(), &recipient())
            .await;

        match result {
            DeliveryResult::Failed { reason } => assert!(reason.contains("401")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    /// Mailer whose provider never answers
    struct StalledMailer;

    #[async_trait]
    impl Mailer for StalledMailer {
        async fn send(&self, _email: &OutgoingEmail) -> Result<(), MailerError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_send_times_out_as_failure() {
        let (client, _) = client(Ok(DRAFT.to_string()));
        let start = tokio::time::Instant::now();

        let result = DeliveryDispatcher::new(Some(Arc::new(StalledMailer)))
            .with_send_timeout(Duration::from_secs(5))
            .deliver(&client, &report(), &recipient())
            .await;

        match result {
            DeliveryResult::Failed { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(3600));
    }
}
