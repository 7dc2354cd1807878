//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    middleware,
    response::Response,
    routing::get as route_get,
    Extension, Router,
};
use base64::Engine;
use parking_lot::Mutex;
use reqwest::{redirect::Policy, Client};
use sa_agent::{sso_agent_middleware, LandingRedirect, SsoAgent};
use sa_core::{
    AgentConfig, AgentError, AgentResult, AgentSession, AuthPayload, HttpBinding,
    LoggedInSession, RequestContext, Saml2Login, SamlSsoHandler, SkipPatterns,
};
use sa_protocol_saml::LogoutRequest;
use sa_server::{build_agent, create_router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Entity ID of the simulated identity provider.
pub const IDP_ENTITY_ID: &str = "https://idp.example.com";

/// SSO endpoint of the simulated identity provider.
pub const IDP_SSO_URL: &str = "https://idp.example.com/samlsso";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sa_agent=debug,sa_protocol_saml=debug,sa_server=debug")
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Running server
// ============================================================================

/// A demo server on a local port plus a client keeping its cookies.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client for testing. Redirects are not followed.
    pub client: Client,
    /// Server state, for inspecting sessions.
    pub state: AppState,
    /// Server shutdown signal.
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a server with SAML enabled against the simulated IdP.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Starts a server after letting the test adjust the agent config.
    pub async fn with_config(customize: impl FnOnce(&mut AgentConfig)) -> anyhow::Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let mut agent_config = saml_config(&base_url);
        customize(&mut agent_config);

        let agent = build_agent(&agent_config)?;
        let state = AppState::new(ServerConfig::for_testing(agent_config));
        let app = create_router(state.clone(), agent);

        let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!("Server error: {}", e);
            }
        });

        let client = new_client()?;

        Ok(Self {
            base_url,
            client,
            state,
            _shutdown_tx,
        })
    }

    /// Returns an absolute URL on the server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The assertion consumer URL the server expects responses on.
    pub fn acs_url(&self) -> String {
        self.url("/acs")
    }

    /// Posts a successful SAML response for `subject` to the ACS.
    pub async fn login(&self, subject: &str, session_index: &str) -> anyhow::Result<reqwest::Response> {
        let xml = saml_response(&self.acs_url(), subject, session_index);
        self.post_saml(&self.client, "/acs", "SAMLResponse", &xml).await
    }

    /// Posts a SAML message with the HTTP-POST binding.
    pub async fn post_saml(
        &self,
        client: &Client,
        path: &str,
        param: &str,
        xml: &str,
    ) -> anyhow::Result<reqwest::Response> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        Ok(client
            .post(self.url(path))
            .form(&[(param, encoded.as_str())])
            .send()
            .await?)
    }
}

/// A client that keeps cookies and does not follow redirects.
pub fn new_client() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .cookie_store(true)
        .redirect(Policy::none())
        .build()?)
}

/// Agent configuration for a server at `base_url`.
pub fn saml_config(base_url: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.skip_urls = SkipPatterns::new(["/static/**", "/favicon.ico"]).expect("valid patterns");
    config.saml2.sp_entity_id = "sample-app".to_string();
    config.saml2.acs_url = format!("{base_url}/acs");
    config.saml2.idp_url = IDP_SSO_URL.to_string();
    config.saml2.idp_entity_id = IDP_ENTITY_ID.to_string();
    config
}

// ============================================================================
// SAML fixtures
// ============================================================================

/// A successful, unsigned authentication response from the simulated IdP.
pub fn saml_response(destination: &str, subject: &str, session_index: &str) -> String {
    format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_resp-{session_index}" Version="2.0" Destination="{destination}">
  <saml:Issuer>{IDP_ENTITY_ID}</saml:Issuer>
  <samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
  <saml:Assertion ID="_assert-{session_index}" Version="2.0">
    <saml:Issuer>{IDP_ENTITY_ID}</saml:Issuer>
    <saml:Subject><saml:NameID>{subject}</saml:NameID></saml:Subject>
    <saml:AuthnStatement SessionIndex="{session_index}"/>
    <saml:AttributeStatement>
      <saml:Attribute Name="role"><saml:AttributeValue>admin</saml:AttributeValue></saml:Attribute>
    </saml:AttributeStatement>
  </saml:Assertion>
</samlp:Response>"#
    )
}

/// An IdP-initiated logout request for a session index.
pub fn idp_logout_request(subject: &str, session_index: &str) -> String {
    LogoutRequest::new(IDP_ENTITY_ID, subject)
        .with_session_index(session_index)
        .to_xml()
}

// ============================================================================
// In-process agent with recording collaborators
// ============================================================================

/// SAML collaborator that records calls, including the passive flag.
#[derive(Default)]
pub struct RecordingSaml {
    calls: Mutex<Vec<String>>,
    failure: Option<fn() -> AgentError>,
}

impl RecordingSaml {
    pub fn failing(failure: fn() -> AgentError) -> Self {
        Self {
            calls: Mutex::default(),
            failure: Some(failure),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn passive_flags(&self) -> Vec<bool> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix("authn passive="))
            .map(|flag| flag == "true")
            .collect()
    }

    fn check(&self) -> AgentResult<()> {
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SamlSsoHandler for RecordingSaml {
    async fn process_response(&self, ctx: &RequestContext) -> AgentResult<()> {
        self.calls.lock().push("response".to_string());
        self.check()?;
        let bean = LoggedInSession {
            saml2: Some(Saml2Login {
                subject: "alice".to_string(),
                ..Saml2Login::default()
            }),
            ..LoggedInSession::default()
        };
        ctx.store_logged_in(&bean)
    }

    async fn build_authn_request(
        &self,
        _: &RequestContext,
        binding: HttpBinding,
        is_passive: bool,
    ) -> AgentResult<AuthPayload> {
        self.calls.lock().push(format!("authn passive={is_passive}"));
        self.check()?;
        Ok(match binding {
            HttpBinding::Redirect => {
                AuthPayload::Redirect(format!("{IDP_SSO_URL}?SAMLRequest=req&passive={is_passive}"))
            }
            HttpBinding::Post => AuthPayload::Form(format!(
                "<form method=\"post\" action=\"{IDP_SSO_URL}\"><input type=\"hidden\" name=\"SAMLRequest\" value=\"req\"/></form>"
            )),
        })
    }

    async fn build_logout_request(
        &self,
        ctx: &RequestContext,
        _: HttpBinding,
    ) -> AgentResult<AuthPayload> {
        self.calls.lock().push("logout".to_string());
        ctx.require_logged_in()?;
        Ok(AuthPayload::Redirect(format!("{IDP_SSO_URL}?SAMLRequest=logout")))
    }

    async fn process_logout(&self, _: &RequestContext) -> AgentResult<()> {
        self.calls.lock().push("logout_callback".to_string());
        self.check()
    }
}

/// A router protecting `/app` with `agent`; every request uses `session`.
pub fn agent_app(agent: SsoAgent, session: AgentSession) -> Router {
    async fn resource(landing: Option<Extension<LandingRedirect>>) -> String {
        match landing {
            Some(Extension(LandingRedirect(url))) => format!("landing:{url}"),
            None => "resource".to_string(),
        }
    }

    Router::new()
        .route("/", route_get(resource).post(resource))
        .route("/{*path}", route_get(resource).post(resource))
        .layer(middleware::from_fn_with_state(agent, sso_agent_middleware))
        .layer(Extension(session))
}

/// A GET request.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("valid request")
}

/// A form-encoded POST request.
pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .expect("valid request")
}

/// Reads a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Shared agent config with SAML enabled.
pub fn shared_config() -> Arc<AgentConfig> {
    Arc::new(saml_config("https://sp.example.com"))
}
