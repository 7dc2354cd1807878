//! SAML2 bearer assertion grant (RFC 7522).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

use sa_core::{AccessToken, AgentError, AgentResult, OAuth2Config, RequestContext, SamlGrantHandler};

use crate::error::{GrantError, GrantResult};

/// Grant type URI for SAML2 bearer assertions.
pub const SAML2_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:saml2-bearer";

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenResponse> for AccessToken {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            refresh_token: token.refresh_token,
            scope: token.scope,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Builds the token request form for an assertion (standard base64 of the
/// assertion XML, as stored in the session).
///
/// Client credentials go in the form only when no client secret is
/// configured; otherwise they are sent with HTTP Basic authentication.
pub fn grant_form(assertion: &str, cfg: &OAuth2Config) -> GrantResult<Vec<(&'static str, String)>> {
    let xml = STANDARD
        .decode(assertion.trim())
        .map_err(|e| GrantError::InvalidAssertion(e.to_string()))?;

    let mut form = vec![
        ("grant_type", SAML2_BEARER_GRANT_TYPE.to_string()),
        ("assertion", URL_SAFE_NO_PAD.encode(xml)),
    ];
    if let Some(scope) = cfg.scope.as_deref().filter(|s| !s.is_empty()) {
        form.push(("scope", scope.to_string()));
    }
    if cfg.client_secret.is_empty() {
        form.push(("client_id", cfg.client_id.clone()));
    }
    Ok(form)
}

/// Interprets a token endpoint response.
pub fn parse_token_response(status: u16, body: &str) -> GrantResult<TokenResponse> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map_err(|e| GrantError::UnexpectedResponse(format!("invalid token response: {e}")));
    }
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => Err(GrantError::TokenEndpoint {
            error: err.error,
            description: err.error_description,
        }),
        Err(_) => Err(GrantError::UnexpectedResponse(format!("status {status}"))),
    }
}

/// Grant collaborator posting to the configured token endpoint.
#[derive(Debug, Clone)]
pub struct SamlBearerGrant {
    client: reqwest::Client,
}

impl SamlBearerGrant {
    /// Creates a grant client with the given request timeout.
    pub fn new(timeout: Duration) -> GrantResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn request_token(&self, assertion: &str, cfg: &OAuth2Config) -> GrantResult<TokenResponse> {
        let form = grant_form(assertion, cfg)?;

        let mut request = self
            .client
            .post(&cfg.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form);
        if !cfg.client_secret.is_empty() {
            request = request.basic_auth(&cfg.client_id, Some(&cfg.client_secret));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_token_response(status, &body)
    }
}

#[async_trait]
impl SamlGrantHandler for SamlBearerGrant {
    async fn exchange_assertion_for_token(&self, ctx: &RequestContext) -> AgentResult<()> {
        let mut bean = ctx.require_logged_in()?;
        let assertion = bean
            .saml2
            .as_ref()
            .and_then(|login| login.assertion.clone())
            .ok_or(AgentError::SessionExpired)?;

        let cfg = &ctx.config().oauth2;
        let token = self.request_token(&assertion, cfg).await?;
        tracing::info!(
            token_type = %token.token_type,
            expires_in = ?token.expires_in,
            "Obtained access token with SAML2 bearer grant"
        );

        bean.access_token = Some(token.into());
        ctx.store_logged_in(&bean)?;
        Ok(())
    }
}
