//! Collaborator interfaces.
//!
//! Each federation protocol is served by one collaborator. The dispatcher
//! selects the collaborator from the request's flow category and never
//! inspects the concrete type behind the trait object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::AgentResult;

/// SAML HTTP-POST binding URI.
pub const HTTP_POST_BINDING_URI: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// SAML HTTP-Redirect binding URI.
pub const HTTP_REDIRECT_BINDING_URI: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";

/// HTTP mechanism used to carry an outbound protocol payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpBinding {
    /// 302 redirect with the message in the query string.
    #[default]
    #[serde(rename = "HTTP-Redirect", alias = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect")]
    Redirect,
    /// Auto-submitting HTML form.
    #[serde(rename = "HTTP-POST", alias = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST")]
    Post,
}

impl HttpBinding {
    /// Parses a binding from a request parameter or configuration value.
    ///
    /// Accepts the SAML binding URIs and the short forms `HTTP-POST` /
    /// `HTTP-Redirect` (case-insensitive). Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == HTTP_POST_BINDING_URI || value.eq_ignore_ascii_case("HTTP-POST") {
            Some(Self::Post)
        } else if value == HTTP_REDIRECT_BINDING_URI
            || value.eq_ignore_ascii_case("HTTP-Redirect")
        {
            Some(Self::Redirect)
        } else {
            None
        }
    }

    /// Returns the SAML binding URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Redirect => HTTP_REDIRECT_BINDING_URI,
            Self::Post => HTTP_POST_BINDING_URI,
        }
    }
}

/// An outbound protocol message ready to be written to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPayload {
    /// Redirect target URL.
    Redirect(String),
    /// Complete HTML page containing an auto-submitting form.
    Form(String),
}

/// SAML 2.0 web SSO and single logout collaborator.
#[async_trait]
pub trait SamlSsoHandler: Send + Sync {
    /// Processes a `SAMLResponse` posted back by the identity provider.
    async fn process_response(&self, ctx: &RequestContext) -> AgentResult<()>;

    /// Builds an authentication request.
    ///
    /// `is_passive` is decided per call by the caller; implementations must
    /// not consult any shared passive-authentication setting.
    async fn build_authn_request(
        &self,
        ctx: &RequestContext,
        binding: HttpBinding,
        is_passive: bool,
    ) -> AgentResult<AuthPayload>;

    /// Builds a logout request for the session attached to the request.
    ///
    /// Returns [`AgentError::SessionExpired`](crate::AgentError::SessionExpired)
    /// when the request carries no logged-in session.
    async fn build_logout_request(
        &self,
        ctx: &RequestContext,
        binding: HttpBinding,
    ) -> AgentResult<AuthPayload>;

    /// Processes an identity-provider initiated `SAMLRequest` logout.
    async fn process_logout(&self, ctx: &RequestContext) -> AgentResult<()>;
}

/// OpenID 2.0 collaborator.
#[async_trait]
pub trait OpenIdHandler: Send + Sync {
    /// Processes an `openid.mode` response from the OpenID provider.
    async fn process_login_response(&self, ctx: &RequestContext) -> AgentResult<()>;

    /// Returns the provider URL the user agent should be redirected to.
    async fn initiate_login(&self, ctx: &RequestContext) -> AgentResult<String>;
}

/// SAML2 bearer assertion to OAuth2 access token collaborator.
#[async_trait]
pub trait SamlGrantHandler: Send + Sync {
    /// Exchanges the session's SAML assertion for an access token and stores
    /// the token in the session.
    async fn exchange_assertion_for_token(&self, ctx: &RequestContext) -> AgentResult<()>;
}
