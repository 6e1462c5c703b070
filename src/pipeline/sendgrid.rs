//! SendGrid mailer
//!
//! Sends HTML email through the SendGrid v3 `mail/send` endpoint.

use crate::pipeline::delivery::{Mailer, MailerError, OutgoingEmail};
use async_trait::async_trait;
use serde::Serialize;

/// Default SendGrid API endpoint
pub const SENDGRID_API_BASE_URL: &str = "https://api.sendgrid.com";

#[derive(Serialize, Debug)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<ContentItem<'a>>,
}

#[derive(Serialize, Debug)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize, Debug)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize, Debug)]
struct ContentItem<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

/// Mailer backed by the SendGrid API
#[derive(Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl SendGridMailer {
    /// Create a mailer sending from `from`
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            base_url: SENDGRID_API_BASE_URL.to_string(),
        }
    }

    /// Point the mailer at a different base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let body = SendRequest {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
            }],
            from: Address { email: &self.from },
            subject: &email.subject,
            content: vec![ContentItem {
                content_type: "text/html",
                value: &email.html_body,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::info!(status_code = status.as_u16(), "SendGrid response");

        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        Err(MailerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "a@b.com".to_string(),
            subject: "AI agents in 2025".to_string(),
            html_body: "<h1>Agents</h1>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_single_personalization() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/mail/send")
            .match_header("authorization", "Bearer sg-key")
            .match_body(Matcher::Json(json!({
                "personalizations": [{"to": [{"email": "a@b.com"}]}],
                "from": {"email": "reports@example.com"},
                "subject": "AI agents in 2025",
                "content": [{"type": "text/html", "value": "<h1>Agents</h1>"}]
            })))
            .with_status(202)
            .create_async()
            .await;

        let mailer = SendGridMailer::new(reqwest::Client::new(), "sg-key", "reports@example.com")
            .with_base_url(server.url());
        let result = mailer.send(&email()).await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/mail/send")
            .with_status(401)
            .with_body(r#"{"errors": [{"message": "invalid key"}]}"#)
            .create_async()
            .await;

        let mailer = SendGridMailer::new(reqwest::Client::new(), "bad", "reports@example.com")
            .with_base_url(server.url());
        let err = mailer.send(&email()).await.unwrap_err();

        mock.assert_async().await;
        match err {
            MailerError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid key"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
