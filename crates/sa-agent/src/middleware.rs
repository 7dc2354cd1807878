//! Axum middleware entry point.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use sa_agent::{sso_agent_middleware, SsoAgent};
//!
//! let app = Router::new()
//!     .route("/app", get(handler))
//!     .layer(middleware::from_fn_with_state(agent, sso_agent_middleware));
//! ```

use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use sa_core::{AgentConfig, AgentError, AgentSession, RequestContext};

use crate::dispatcher::FlowOutcome;
use crate::SsoAgent;

/// Largest form body the agent buffers to read protocol parameters.
pub const MAX_FORM_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Request extension set when the downstream handler should show the
/// landing view instead of the requested resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingRedirect(pub String);

/// Runs the SSO agent in front of the wrapped routes.
///
/// The agent configuration comes from an `Arc<AgentConfig>` request
/// extension when one is present, otherwise from the agent itself. The
/// browser session is read from the [`AgentSession`] request extension.
pub async fn sso_agent_middleware(
    State(agent): State<SsoAgent>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let config = parts
        .extensions
        .get::<Arc<AgentConfig>>()
        .cloned()
        .or_else(|| agent.config().cloned());
    let Some(config) = config else {
        let err = AgentError::ConfigurationMissing("no agent configuration for request".into());
        tracing::error!(path = parts.uri.path(), error = %err, "Cannot run SSO agent");
        return err.into_response();
    };

    let (form, body) = if is_form(&parts.headers) {
        match body::to_bytes(body, MAX_FORM_BODY_BYTES).await {
            Ok(bytes) => (Some(bytes.clone()), Body::from(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to buffer form body");
                return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
            }
        }
    } else {
        (None, body)
    };

    let mut ctx = RequestContext::new(parts.method.clone(), parts.uri.path(), config);
    if let Some(query) = parts.uri.query() {
        ctx = ctx.with_query(query);
    }
    if let Some(form) = &form {
        ctx = ctx.with_form_body(form);
    }
    if let Some(session) = parts.extensions.get::<AgentSession>() {
        ctx = ctx.with_session(session.clone());
    }

    match agent.dispatch(&ctx).await {
        Ok(FlowOutcome::Continue) => next.run(Request::from_parts(parts, body)).await,
        Ok(FlowOutcome::ContinueToLanding) => {
            let landing = ctx.config().session_keys.landing_url.clone();
            parts.extensions.insert(LandingRedirect(landing));
            next.run(Request::from_parts(parts, body)).await
        }
        Ok(FlowOutcome::Redirect(url)) => redirect_response(&url),
        Ok(FlowOutcome::Form(html)) => form_response(html),
        Err(err) => err.into_response(),
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

/// `302 Found` to `url`.
pub fn redirect_response(url: &str) -> Response {
    match header::HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => AgentError::Internal(format!("redirect target is not a valid header: {url}"))
            .into_response(),
    }
}

/// `200 OK` auto-submitting form page.
pub fn form_response(html: String) -> Response {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Html(html),
    )
        .into_response()
}
