//! Flow dispatch and failure recovery.
//!
//! The dispatcher turns a classified request into a [`FlowOutcome`] by
//! calling the collaborator responsible for the category. Two failure
//! channels exist:
//!
//! - Recoverable errors ([`AgentError::is_recoverable`], currently only
//!   [`AgentError::SessionExpired`]) from any step become
//!   [`FlowOutcome::ContinueToLanding`].
//! - Protocol failures while processing an SSO or OpenID response clear the
//!   logged-in session and are then returned. Protocol failures in other
//!   categories are returned without touching the session.

use std::sync::Arc;

use sa_core::{
    AgentError, AgentResult, AuthPayload, HttpBinding, OpenIdHandler, RequestContext,
    SamlGrantHandler, SamlSsoHandler,
};

use crate::classifier::FlowCategory;

/// Request parameter that selects the SAML binding.
pub const BINDING_PARAM: &str = "binding";

/// What the host should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Pass the request downstream unchanged.
    Continue,
    /// Pass the request downstream marked for the landing view.
    ContinueToLanding,
    /// Terminate with a redirect to the URL.
    Redirect(String),
    /// Terminate with the HTML page.
    Form(String),
}

impl FlowOutcome {
    /// Returns whether the request ends in the agent.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Redirect(_) | Self::Form(_))
    }
}

impl From<AuthPayload> for FlowOutcome {
    fn from(payload: AuthPayload) -> Self {
        match payload {
            AuthPayload::Redirect(url) => Self::Redirect(url),
            AuthPayload::Form(html) => Self::Form(html),
        }
    }
}

/// Routes categories to the installed collaborators.
#[derive(Clone, Default)]
pub struct Dispatcher {
    saml: Option<Arc<dyn SamlSsoHandler>>,
    openid: Option<Arc<dyn OpenIdHandler>>,
    grant: Option<Arc<dyn SamlGrantHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("saml", &self.saml.is_some())
            .field("openid", &self.openid.is_some())
            .field("grant", &self.grant.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher without collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the SAML collaborator.
    #[must_use]
    pub fn with_saml(mut self, saml: Arc<dyn SamlSsoHandler>) -> Self {
        self.saml = Some(saml);
        self
    }

    /// Installs the OpenID collaborator.
    #[must_use]
    pub fn with_openid(mut self, openid: Arc<dyn OpenIdHandler>) -> Self {
        self.openid = Some(openid);
        self
    }

    /// Installs the OAuth2 grant collaborator.
    #[must_use]
    pub fn with_grant(mut self, grant: Arc<dyn SamlGrantHandler>) -> Self {
        self.grant = Some(grant);
        self
    }

    /// Handles a classified request and applies failure recovery.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        category: FlowCategory,
    ) -> AgentResult<FlowOutcome> {
        match self.run(ctx, category).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(
                    category = %category,
                    path = ctx.path(),
                    "Session expired or already logged out, redirecting to landing view"
                );
                Ok(FlowOutcome::ContinueToLanding)
            }
            Err(err) => {
                if err.is_protocol_failure()
                    && category.clears_session_on_failure()
                    && ctx.clear_logged_in()
                {
                    tracing::warn!(category = %category, "Cleared logged-in session after failure");
                }
                tracing::error!(
                    category = %category,
                    path = ctx.path(),
                    error = %err,
                    "SSO agent flow failed"
                );
                Err(err)
            }
        }
    }

    async fn run(&self, ctx: &RequestContext, category: FlowCategory) -> AgentResult<FlowOutcome> {
        match category {
            FlowCategory::Skip | FlowCategory::PassThrough => Ok(FlowOutcome::Continue),
            FlowCategory::SloCallback => {
                self.saml(category)?.process_logout(ctx).await?;
                Ok(FlowOutcome::ContinueToLanding)
            }
            FlowCategory::SsoResponse => {
                self.saml(category)?.process_response(ctx).await?;
                Ok(FlowOutcome::Continue)
            }
            FlowCategory::OpenIdResponse => {
                self.openid(category)?.process_login_response(ctx).await?;
                Ok(FlowOutcome::Continue)
            }
            FlowCategory::SloInitiate => {
                let payload = self
                    .saml(category)?
                    .build_logout_request(ctx, select_binding(ctx))
                    .await?;
                Ok(payload.into())
            }
            FlowCategory::SsoInitiate => {
                let is_passive = ctx.config().saml2.passive_authn;
                let payload = self
                    .saml(category)?
                    .build_authn_request(ctx, select_binding(ctx), is_passive)
                    .await?;
                Ok(payload.into())
            }
            FlowCategory::OpenIdInitiate => {
                let url = self.openid(category)?.initiate_login(ctx).await?;
                Ok(FlowOutcome::Redirect(url))
            }
            FlowCategory::PassiveAuthInitiate => {
                let payload = self
                    .saml(category)?
                    .build_authn_request(ctx, HttpBinding::Redirect, true)
                    .await?;
                Ok(payload.into())
            }
            FlowCategory::OAuth2GrantExchange => {
                self.grant(category)?.exchange_assertion_for_token(ctx).await?;
                Ok(FlowOutcome::Continue)
            }
        }
    }

    fn saml(&self, category: FlowCategory) -> AgentResult<&dyn SamlSsoHandler> {
        self.saml
            .as_deref()
            .ok_or_else(|| missing_collaborator("SAML2", category))
    }

    fn openid(&self, category: FlowCategory) -> AgentResult<&dyn OpenIdHandler> {
        self.openid
            .as_deref()
            .ok_or_else(|| missing_collaborator("OpenID", category))
    }

    fn grant(&self, category: FlowCategory) -> AgentResult<&dyn SamlGrantHandler> {
        self.grant
            .as_deref()
            .ok_or_else(|| missing_collaborator("OAuth2 grant", category))
    }
}

fn missing_collaborator(name: &str, category: FlowCategory) -> AgentError {
    AgentError::ConfigurationMissing(format!(
        "no {name} collaborator installed for {category} requests"
    ))
}

/// Picks the binding for an outbound SAML message.
///
/// An explicit `binding` parameter wins over the configured default; any
/// value other than HTTP-POST means redirect.
#[must_use]
pub fn select_binding(ctx: &RequestContext) -> HttpBinding {
    match ctx.param(BINDING_PARAM) {
        Some(value) if HttpBinding::parse(value) == Some(HttpBinding::Post) => HttpBinding::Post,
        Some(_) => HttpBinding::Redirect,
        None => ctx.config().saml2.http_binding,
    }
}
