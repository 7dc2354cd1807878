//! OpenID 2.0 login manager.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sa_core::{AgentResult, OpenIdHandler, OpenIdLogin, RequestContext};

use crate::error::{OpenIdError, OpenIdResult};
use crate::message::{CheckIdRequest, PositiveAssertion, MODE};
use crate::verifier::{AssertionVerifier, DirectVerifier};

/// OpenID relying party collaborator.
#[derive(Clone)]
pub struct OpenIdManager {
    verifier: Arc<dyn AssertionVerifier>,
}

impl std::fmt::Debug for OpenIdManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenIdManager").finish_non_exhaustive()
    }
}

impl OpenIdManager {
    /// Creates a manager with a custom verifier.
    #[must_use]
    pub fn new(verifier: Arc<dyn AssertionVerifier>) -> Self {
        Self { verifier }
    }

    /// Creates a manager that verifies assertions over HTTP.
    pub fn direct(timeout: Duration) -> OpenIdResult<Self> {
        Ok(Self::new(Arc::new(DirectVerifier::new(timeout)?)))
    }

    async fn accept_assertion(&self, ctx: &RequestContext) -> AgentResult<()> {
        let cfg = &ctx.config().openid;
        let assertion = PositiveAssertion::from_context(ctx)?;
        assertion.check_return_to(&cfg.return_to)?;

        // Only the configured provider is ever asked to verify.
        let endpoint = cfg.provider_url.as_str();
        if let Some(claimed) = assertion.op_endpoint.as_deref() {
            if claimed != endpoint {
                return Err(OpenIdError::EndpointMismatch {
                    expected: endpoint.to_string(),
                    actual: claimed.to_string(),
                }
                .into());
            }
        }
        if !self.verifier.verify(endpoint, &assertion.fields).await? {
            return Err(OpenIdError::VerificationFailed(format!(
                "provider rejected assertion for {}",
                assertion.claimed_id
            ))
            .into());
        }

        let mut bean = ctx.logged_in()?.unwrap_or_default();
        bean.openid = Some(OpenIdLogin {
            claimed_id: assertion.claimed_id.clone(),
            attributes: assertion.ax_attributes(),
        });
        ctx.store_logged_in(&bean)?;

        tracing::info!(claimed_id = %assertion.claimed_id, "OpenID login established");
        Ok(())
    }
}

#[async_trait]
impl OpenIdHandler for OpenIdManager {
    async fn process_login_response(&self, ctx: &RequestContext) -> AgentResult<()> {
        match ctx.param(MODE) {
            Some("id_res") => self.accept_assertion(ctx).await,
            Some("cancel") => Err(OpenIdError::Cancelled.into()),
            Some("error") => Err(OpenIdError::Provider(
                ctx.param("openid.error")
                    .unwrap_or("unspecified error")
                    .to_string(),
            )
            .into()),
            Some(other) => Err(OpenIdError::UnexpectedMode(other.to_string()).into()),
            None => Err(OpenIdError::MissingParameter(MODE.to_string()).into()),
        }
    }

    async fn initiate_login(&self, ctx: &RequestContext) -> AgentResult<String> {
        let cfg = &ctx.config().openid;
        let url = CheckIdRequest::new(ctx.param(&cfg.claimed_id_param), &cfg.return_to)
            .with_realm(&cfg.realm)
            .to_url(&cfg.provider_url)?;
        tracing::debug!(provider = %cfg.provider_url, "Redirecting to OpenID provider");
        Ok(url)
    }
}
