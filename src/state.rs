//! Application state
//!
//! Shared, read-only handles resolved at startup. Nothing in here changes
//! after the server starts; every request builds its own [`Orchestrator`].

use crate::config::Config;
use crate::pipeline::capability::{CapabilityClient, ReasoningCapability};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::delivery::{DeliveryDispatcher, Mailer};
use crate::pipeline::gemini::GeminiCapability;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::roles::RoleRegistry;
use crate::pipeline::sendgrid::SendGridMailer;
use std::sync::Arc;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    /// Pipeline tunables
    pub config: PipelineConfig,
    roles: Arc<RoleRegistry>,
    backend: Arc<dyn ReasoningCapability>,
    dispatcher: DeliveryDispatcher,
}

impl AppState {
    /// Assemble state from explicit collaborators
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn ReasoningCapability>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let dispatcher =
            DeliveryDispatcher::new(mailer).with_send_timeout(config.capability_timeout());
        Self {
            roles: Arc::new(RoleRegistry::new(config.num_searches)),
            config,
            backend,
            dispatcher,
        }
    }

    /// Build the Gemini and SendGrid backends described by `config`
    ///
    /// `client` is shared by both backends for connection pooling.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let backend = GeminiCapability::new(
            client.clone(),
            config.gemini.api_key.clone(),
            config.pipeline.gemini_model.clone(),
        )
        .with_base_url(config.gemini.base_url.clone());

        let mailer = config.sendgrid.api_key.as_ref().map(|api_key| {
            Arc::new(
                SendGridMailer::new(client, api_key.clone(), config.pipeline.from_email.clone())
                    .with_base_url(config.sendgrid.base_url.clone()),
            ) as Arc<dyn Mailer>
        });

        Self::new(config.pipeline.clone(), Arc::new(backend), mailer)
    }

    /// Whether report emails can be sent
    pub fn delivery_configured(&self) -> bool {
        self.dispatcher.is_configured()
    }

    /// A fresh orchestrator with its own capability client handle
    pub fn orchestrator(&self) -> Orchestrator {
        let client = CapabilityClient::new(
            self.backend.clone(),
            self.roles.clone(),
            self.config.capability_timeout(),
        )
        .with_max_attempts(self.config.capability_max_attempts);
        Orchestrator::new(client, self.dispatcher.clone(), &self.config)
    }
}
