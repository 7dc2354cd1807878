//! Stub collaborators shared by unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sa_core::{
    AgentConfig, AgentError, AgentResult, AgentSession, AuthPayload, HttpBinding,
    LoggedInSession, OpenIdHandler, RequestContext, Saml2Login, SamlGrantHandler, SamlSsoHandler,
};

/// Configuration with every protocol enabled.
pub fn config() -> Arc<AgentConfig> {
    let mut config = AgentConfig::default();
    config.saml2_enabled = true;
    config.openid_enabled = true;
    config.oauth2_grant_enabled = true;
    Arc::new(config)
}

/// A session carrying a SAML login.
pub fn logged_in_session(config: &AgentConfig) -> AgentSession {
    let session = AgentSession::new();
    let bean = LoggedInSession {
        saml2: Some(Saml2Login {
            subject: "alice".to_string(),
            ..Saml2Login::default()
        }),
        ..LoggedInSession::default()
    };
    session
        .set_json(&config.session_keys.logged_in, &bean)
        .unwrap();
    session
}

/// SAML collaborator recording each call.
#[derive(Default)]
pub struct StubSaml {
    calls: Mutex<Vec<String>>,
    failure: Option<fn() -> AgentError>,
}

impl StubSaml {
    pub fn failing(failure: fn() -> AgentError) -> Self {
        Self {
            calls: Mutex::default(),
            failure: Some(failure),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> AgentResult<()> {
        self.calls.lock().push(call);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

fn payload(binding: HttpBinding, what: &str) -> AuthPayload {
    match binding {
        HttpBinding::Redirect => AuthPayload::Redirect(format!("https://idp.example.com/{what}")),
        HttpBinding::Post => AuthPayload::Form(format!("<form>{what}</form>")),
    }
}

#[async_trait]
impl SamlSsoHandler for StubSaml {
    async fn process_response(&self, _: &RequestContext) -> AgentResult<()> {
        self.record("response".to_string())
    }

    async fn build_authn_request(
        &self,
        _: &RequestContext,
        binding: HttpBinding,
        is_passive: bool,
    ) -> AgentResult<AuthPayload> {
        self.record(format!("authn({binding:?}, passive={is_passive})"))?;
        Ok(payload(binding, "sso"))
    }

    async fn build_logout_request(
        &self,
        _: &RequestContext,
        binding: HttpBinding,
    ) -> AgentResult<AuthPayload> {
        self.record(format!("logout({binding:?})"))?;
        Ok(payload(binding, "slo"))
    }

    async fn process_logout(&self, _: &RequestContext) -> AgentResult<()> {
        self.record("logout_callback".to_string())
    }
}

/// OpenID collaborator that always succeeds.
#[derive(Default)]
pub struct StubOpenId;

#[async_trait]
impl OpenIdHandler for StubOpenId {
    async fn process_login_response(&self, _: &RequestContext) -> AgentResult<()> {
        Ok(())
    }

    async fn initiate_login(&self, _: &RequestContext) -> AgentResult<String> {
        Ok("https://op.example.com/login".to_string())
    }
}

/// Grant collaborator that always succeeds.
#[derive(Default)]
pub struct StubGrant;

#[async_trait]
impl SamlGrantHandler for StubGrant {
    async fn exchange_assertion_for_token(&self, _: &RequestContext) -> AgentResult<()> {
        Ok(())
    }
}
