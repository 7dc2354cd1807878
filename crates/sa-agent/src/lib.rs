//! # sa-agent
//!
//! The SSO agent: a single entry point in front of a protected application
//! that recognises federation protocol traffic and either completes the
//! protocol step or lets the request through.
//!
//! - [`classifier`] - Ordered rules mapping a request to a [`FlowCategory`]
//! - [`dispatcher`] - Collaborator calls and failure recovery
//! - [`middleware`] - The axum middleware
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sa_agent::SsoAgent;
//!
//! let agent = SsoAgent::new()
//!     .with_config(AgentConfig::from_env()?)
//!     .with_saml(Arc::new(Saml2SsoManager::new(registry)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use sa_core::{
    AgentConfig, AgentResult, OpenIdHandler, RequestContext, SamlGrantHandler, SamlSsoHandler,
};

pub mod classifier;
pub mod dispatcher;
pub mod middleware;

#[cfg(test)]
mod test_support;

pub use classifier::{classify, FlowCategory};
pub use dispatcher::{Dispatcher, FlowOutcome};
pub use middleware::{sso_agent_middleware, LandingRedirect};

/// The SSO agent shared by every request of a deployment.
///
/// Cloning is cheap; configuration and collaborators sit behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SsoAgent {
    config: Option<Arc<AgentConfig>>,
    dispatcher: Dispatcher,
}

impl SsoAgent {
    /// Creates an agent without configuration or collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deployment-wide configuration.
    #[must_use]
    pub fn with_config(self, config: AgentConfig) -> Self {
        self.with_shared_config(Arc::new(config))
    }

    /// Sets an already shared configuration.
    #[must_use]
    pub fn with_shared_config(mut self, config: Arc<AgentConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Installs the SAML collaborator.
    #[must_use]
    pub fn with_saml(mut self, saml: Arc<dyn SamlSsoHandler>) -> Self {
        self.dispatcher = self.dispatcher.with_saml(saml);
        self
    }

    /// Installs the OpenID collaborator.
    #[must_use]
    pub fn with_openid(mut self, openid: Arc<dyn OpenIdHandler>) -> Self {
        self.dispatcher = self.dispatcher.with_openid(openid);
        self
    }

    /// Installs the OAuth2 grant collaborator.
    #[must_use]
    pub fn with_grant(mut self, grant: Arc<dyn SamlGrantHandler>) -> Self {
        self.dispatcher = self.dispatcher.with_grant(grant);
        self
    }

    /// Returns the deployment-wide configuration, if set.
    #[must_use]
    pub fn config(&self) -> Option<&Arc<AgentConfig>> {
        self.config.as_ref()
    }

    /// Classifies and handles a request.
    ///
    /// For hosts that do not use [`sso_agent_middleware`].
    pub async fn dispatch(&self, ctx: &RequestContext) -> AgentResult<FlowOutcome> {
        let category = classify(ctx);
        tracing::debug!(category = %category, path = ctx.path(), "Classified request");
        self.dispatcher.dispatch(ctx, category).await
    }
}
