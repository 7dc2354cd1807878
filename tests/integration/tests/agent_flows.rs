//! Agent behavior end to end through the middleware, with recording
//! collaborators standing in for the protocol implementations.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use sa_agent::SsoAgent;
use sa_core::{AgentConfig, AgentError, AgentSession, LoggedInSession, ProtocolKind};
use tower::ServiceExt;

use crate::common::{agent_app, body_text, get, post_form, shared_config, RecordingSaml};

fn agent(config: &Arc<AgentConfig>, saml: &Arc<RecordingSaml>) -> SsoAgent {
    SsoAgent::new()
        .with_shared_config(config.clone())
        .with_saml(saml.clone())
}

fn logged_in(config: &AgentConfig, session: &AgentSession) -> Option<LoggedInSession> {
    session.get_json(&config.session_keys.logged_in).unwrap()
}

fn sign_in(config: &AgentConfig, session: &AgentSession) {
    session
        .set_json(&config.session_keys.logged_in, &LoggedInSession::default())
        .unwrap();
}

#[tokio::test]
async fn skipped_path_reaches_the_application_untouched() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let app = agent_app(agent(&config, &saml), AgentSession::new());

    // Protocol parameters do not matter on a skipped path.
    let response = app
        .oneshot(get("/static/css/site.css?SAMLResponse=abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "resource");
    assert!(saml.calls().is_empty());
}

#[tokio::test]
async fn successful_saml_response_continues_downstream() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let session = AgentSession::new();
    session.set_attribute("cart", "3 items");
    let app = agent_app(agent(&config, &saml), session.clone());

    let response = app
        .oneshot(post_form("/acs", "SAMLResponse=PHJlc3BvbnNlLz4%3D"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "resource");
    assert_eq!(saml.calls(), ["response"]);
    assert_eq!(session.get_attribute("cart").as_deref(), Some("3 items"));
    assert!(logged_in(&config, &session).is_some());
}

#[tokio::test]
async fn failed_saml_response_clears_login_and_stops() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::failing(|| {
        AgentError::protocol(ProtocolKind::Saml2, "signature mismatch")
    }));
    let session = AgentSession::new();
    sign_in(&config, &session);
    let app = agent_app(agent(&config, &saml), session.clone());

    let response = app
        .oneshot(post_form("/acs", "SAMLResponse=bad"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_ne!(body_text(response).await, "resource");
    assert!(logged_in(&config, &session).is_none());
}

#[tokio::test]
async fn failed_logout_callback_keeps_login() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::failing(|| {
        AgentError::protocol(ProtocolKind::Saml2, "unknown issuer")
    }));
    let session = AgentSession::new();
    sign_in(&config, &session);
    let app = agent_app(agent(&config, &saml), session.clone());

    let response = app
        .oneshot(post_form("/acs", "SAMLRequest=bad"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(saml.calls(), ["logout_callback"]);
    assert!(logged_in(&config, &session).is_some());
}

#[tokio::test]
async fn post_binding_renders_auto_submit_form() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let app = agent_app(agent(&config, &saml), AgentSession::new());

    let response = app
        .oneshot(get("/samlsso?binding=HTTP-POST"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = body_text(response).await;
    assert!(body.contains("name=\"SAMLRequest\""));
    assert_ne!(body, "resource");
    assert_eq!(saml.passive_flags(), [false]);
}

#[tokio::test]
async fn expired_session_goes_to_landing_view() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let app = agent_app(agent(&config, &saml), AgentSession::new());

    // Logging out without a login is the expiry case.
    let response = app.oneshot(get("/logout")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "landing:/");
    assert_eq!(saml.calls(), ["logout"]);
}

#[tokio::test]
async fn passive_endpoint_forces_passive_for_that_request_only() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let app = agent_app(agent(&config, &saml), AgentSession::new());

    let response = app.clone().oneshot(get("/passiveauth")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.ends_with("passive=true"));
    assert!(!config.saml2.passive_authn);

    let response = app.oneshot(get("/samlsso")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(saml.passive_flags(), [true, false]);
}

#[tokio::test]
async fn concurrent_passive_and_interactive_requests_do_not_interfere() {
    let config = shared_config();
    let saml = Arc::new(RecordingSaml::default());
    let app = agent_app(agent(&config, &saml), AgentSession::new());

    let mut handles = Vec::new();
    for i in 0..64 {
        let app = app.clone();
        let (path, passive) = if i % 2 == 0 {
            ("/passiveauth", true)
        } else {
            ("/samlsso", false)
        };
        handles.push(tokio::spawn(async move {
            let response = app.oneshot(get(path)).await.unwrap();
            let location = response.headers()[header::LOCATION]
                .to_str()
                .unwrap()
                .to_string();
            (passive, location)
        }));
    }

    for handle in handles {
        let (passive, location) = handle.await.unwrap();
        assert!(
            location.ends_with(&format!("passive={passive}")),
            "expected passive={passive} in {location}"
        );
    }

    let flags = saml.passive_flags();
    assert_eq!(flags.len(), 64);
    assert_eq!(flags.iter().filter(|p| **p).count(), 32);
    assert!(!config.saml2.passive_authn);
}

#[tokio::test]
async fn missing_configuration_is_fatal() {
    let saml = Arc::new(RecordingSaml::default());
    let agent = SsoAgent::new().with_saml(saml.clone());
    let app = agent_app(agent, AgentSession::new());

    let response = app.oneshot(get("/samlsso")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(saml.calls().is_empty());
}
