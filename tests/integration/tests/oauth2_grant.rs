//! SAML2 bearer grant against a local token endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Form, Router,
};
use parking_lot::Mutex;
use sa_oauth2_grant::SAML2_BEARER_GRANT_TYPE;
use serde_json::json;
use tokio::net::TcpListener;

use crate::common::TestEnv;

#[derive(Clone, Default)]
struct TokenEndpoint {
    requests: Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>,
    reject: bool,
}

async fn token(
    State(endpoint): State<TokenEndpoint>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    endpoint.requests.lock().push((auth, form));

    if endpoint.reject {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "assertion expired" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": "at-123",
            "token_type": "Bearer",
            "expires_in": 3600
        })),
    )
}

async fn spawn_token_endpoint(endpoint: TokenEndpoint) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/oauth2/token", listener.local_addr()?);
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .with_state(endpoint);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(url)
}

async fn env_with_grant(token_endpoint: String) -> anyhow::Result<TestEnv> {
    TestEnv::with_config(|config| {
        config.oauth2_grant_enabled = true;
        config.oauth2.token_endpoint = token_endpoint;
        config.oauth2.client_id = "sample-app".to_string();
        config.oauth2.client_secret = "s3cret".to_string();
        config.oauth2.scope = Some("openid".to_string());
    })
    .await
}

/// The assertion from the SAML login is exchanged for an access token.
#[tokio::test]
async fn test_assertion_exchanged_for_token() -> anyhow::Result<()> {
    let endpoint = TokenEndpoint::default();
    let env = env_with_grant(spawn_token_endpoint(endpoint.clone()).await?).await?;
    env.login("alice@example.com", "idx-20").await?;

    let response = env.client.get(env.url("/token")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let requests = endpoint.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    let (auth, form) = &requests[0];
    assert!(auth.as_deref().is_some_and(|a| a.starts_with("Basic ")));
    assert_eq!(form["grant_type"], SAML2_BEARER_GRANT_TYPE);
    assert!(!form["assertion"].is_empty());
    assert_eq!(form["scope"], "openid");
    assert!(!form.contains_key("client_id"));

    let body = env.client.get(env.url("/app")).send().await?.text().await?;
    assert!(body.contains("access token is held"));

    Ok(())
}

/// A rejected grant fails the request but keeps the SAML login.
#[tokio::test]
async fn test_rejected_grant_keeps_login() -> anyhow::Result<()> {
    let endpoint = TokenEndpoint {
        reject: true,
        ..TokenEndpoint::default()
    };
    let env = env_with_grant(spawn_token_endpoint(endpoint).await?).await?;
    env.login("alice@example.com", "idx-21").await?;

    let response = env.client.get(env.url("/token")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = env.client.get(env.url("/app")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.text().await?.contains("access token is held"));

    Ok(())
}

/// Without a SAML login there is nothing to exchange.
#[tokio::test]
async fn test_grant_without_login_lands_home() -> anyhow::Result<()> {
    let endpoint = TokenEndpoint::default();
    let env = env_with_grant(spawn_token_endpoint(endpoint.clone()).await?).await?;

    let response = env.client.get(env.url("/token")).send().await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(endpoint.requests.lock().is_empty());

    Ok(())
}
