//! SAML 2.0 SSO manager.
//!
//! [`Saml2SsoManager`] builds outbound AuthnRequest and LogoutRequest
//! messages, consumes responses posted to the assertion consumer URL and
//! terminates sessions when the identity provider propagates a logout.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use sa_core::{
    AgentError, AgentResult, AuthPayload, HttpBinding, RequestContext, Saml2Config, Saml2Login,
    SamlSsoHandler, SessionRegistry,
};

use crate::bindings::{DecodedMessage, HttpPostBinding, HttpRedirectBinding};
use crate::error::{SamlError, SamlResult};
use crate::types::{
    params, AuthnRequest, InboundResponse, LogoutRequest, ResponseStatus, SamlResponse,
};

/// SAML service provider collaborator.
#[derive(Debug, Clone)]
pub struct Saml2SsoManager {
    registry: Arc<SessionRegistry>,
}

impl Saml2SsoManager {
    /// Creates a manager that records logins in `registry`.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the session-index registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn handle_authn_response(
        &self,
        ctx: &RequestContext,
        response: SamlResponse,
    ) -> AgentResult<()> {
        let cfg = &ctx.config().saml2;
        check_issuer(cfg, response.issuer.as_deref())?;

        if let Some(destination) = response.destination.as_deref() {
            if !cfg.acs_url.is_empty() && destination != cfg.acs_url {
                return Err(SamlError::InvalidDestination {
                    expected: cfg.acs_url.clone(),
                    actual: destination.to_string(),
                }
                .into());
            }
        }

        if !response.status.is_success() {
            if response.status.is_no_passive() {
                tracing::debug!(response_id = %response.id, "IdP declined passive authentication");
                return Ok(());
            }
            return Err(response.status.into_error().into());
        }

        let subject = response
            .subject
            .clone()
            .ok_or_else(|| SamlError::MissingElement("Subject/NameID".to_string()))?;
        if response.assertion_xml.is_none() {
            return Err(SamlError::MissingElement("Assertion".to_string()).into());
        }

        let mut bean = ctx.logged_in()?.unwrap_or_default();
        bean.saml2 = Some(Saml2Login {
            subject: subject.clone(),
            session_index: response.session_index.clone(),
            assertion: response.assertion_base64(),
            attributes: response.attributes,
        });
        ctx.store_logged_in(&bean)?;

        if let (Some(index), Some(session)) = (response.session_index.as_deref(), ctx.session()) {
            self.registry.register(index, session.clone());
        }

        tracing::info!(
            subject = %subject,
            session_index = ?response.session_index,
            "SAML2 login established"
        );
        Ok(())
    }

    fn handle_logout_response(
        &self,
        ctx: &RequestContext,
        status: ResponseStatus,
    ) -> AgentResult<()> {
        if !status.is_success() {
            return Err(status.into_error().into());
        }
        let index = ctx
            .logged_in()?
            .and_then(|bean| bean.saml2)
            .and_then(|login| login.session_index);
        ctx.clear_logged_in();
        if let Some(session) = ctx.session() {
            if let Some(index) = index.as_deref() {
                self.registry.remove(index, session);
            }
            session.invalidate();
        }
        tracing::info!("SAML2 logout completed");
        Ok(())
    }
}

#[async_trait]
impl SamlSsoHandler for Saml2SsoManager {
    async fn process_response(&self, ctx: &RequestContext) -> AgentResult<()> {
        let message = decode_inbound(ctx)?;
        match InboundResponse::parse(&message.xml)? {
            InboundResponse::Response(response) => self.handle_authn_response(ctx, response),
            InboundResponse::LogoutResponse(status) => self.handle_logout_response(ctx, status),
        }
    }

    async fn build_authn_request(
        &self,
        ctx: &RequestContext,
        binding: HttpBinding,
        is_passive: bool,
    ) -> AgentResult<AuthPayload> {
        let cfg = &ctx.config().saml2;

        let mut request = AuthnRequest::new(&cfg.sp_entity_id)
            .with_destination(&cfg.idp_url)
            .with_acs_url(&cfg.acs_url)
            .with_binding(HttpBinding::Post)
            .force_authn(cfg.force_authn)
            .is_passive(is_passive);
        if let Some(format) = &cfg.name_id_format {
            request = request.with_name_id_format(format);
        }

        tracing::debug!(
            request_id = %request.id,
            ?binding,
            is_passive,
            "Built SAML2 AuthnRequest"
        );
        Ok(encode(&request.to_xml(), cfg, binding)?)
    }

    async fn build_logout_request(
        &self,
        ctx: &RequestContext,
        binding: HttpBinding,
    ) -> AgentResult<AuthPayload> {
        let login = ctx
            .require_logged_in()?
            .saml2
            .ok_or(AgentError::SessionExpired)?;
        let cfg = &ctx.config().saml2;

        let mut request = LogoutRequest::new(&cfg.sp_entity_id, &login.subject)
            .with_destination(&cfg.idp_url)
            .with_reason(LogoutRequest::REASON_USER);
        if let Some(format) = &cfg.name_id_format {
            request = request.with_name_id_format(format);
        }
        if let Some(index) = login.session_index {
            request = request.with_session_index(index);
        }

        tracing::debug!(request_id = %request.id, ?binding, "Built SAML2 LogoutRequest");
        Ok(encode(&request.to_xml(), cfg, binding)?)
    }

    async fn process_logout(&self, ctx: &RequestContext) -> AgentResult<()> {
        let message = decode_inbound(ctx)?;
        let request = LogoutRequest::parse(&message.xml)?;
        check_issuer(&ctx.config().saml2, Some(request.issuer.as_str()))?;

        if request.session_indexes.is_empty() {
            return Err(SamlError::MissingElement("SessionIndex".to_string()).into());
        }

        let terminated: usize = request
            .session_indexes
            .iter()
            .map(|index| self.registry.invalidate(index))
            .sum();

        tracing::info!(
            subject = %request.name_id,
            terminated,
            "Processed IdP-initiated logout"
        );
        Ok(())
    }
}

/// Takes the SAML message off whichever binding carried it.
///
/// POST bodies carry plain base64; GET query strings carry deflated messages.
fn decode_inbound(ctx: &RequestContext) -> SamlResult<DecodedMessage> {
    let saml_request = ctx.param(params::SAML_REQUEST);
    let saml_response = ctx.param(params::SAML_RESPONSE);
    let relay_state = ctx.param(params::RELAY_STATE);

    if *ctx.method() == Method::POST {
        HttpPostBinding::decode(saml_request, saml_response, relay_state)
    } else {
        HttpRedirectBinding::decode(saml_request, saml_response, relay_state)
    }
}

fn check_issuer(cfg: &Saml2Config, issuer: Option<&str>) -> SamlResult<()> {
    if cfg.idp_entity_id.is_empty() {
        return Ok(());
    }
    match issuer {
        Some(actual) if actual == cfg.idp_entity_id => Ok(()),
        other => Err(SamlError::InvalidIssuer {
            expected: cfg.idp_entity_id.clone(),
            actual: other.unwrap_or_default().to_string(),
        }),
    }
}

fn encode(xml: &str, cfg: &Saml2Config, binding: HttpBinding) -> SamlResult<AuthPayload> {
    let relay_state = cfg.relay_state.as_deref();
    match binding {
        HttpBinding::Redirect => Ok(AuthPayload::Redirect(HttpRedirectBinding::encode_request(
            xml,
            &cfg.idp_url,
            relay_state,
        )?)),
        HttpBinding::Post => Ok(AuthPayload::Form(HttpPostBinding::encode_request(
            xml,
            &cfg.idp_url,
            relay_state,
        ))),
    }
}
