//! Router configuration.
//!
//! The sample application lives under `/app`. Everything except the health
//! check runs behind the session layer and the SSO agent.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Extension, Router,
};
use sa_agent::{sso_agent_middleware, LandingRedirect, SsoAgent};
use sa_core::{AgentSession, LoggedInSession};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::session::session_middleware;
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState, agent: SsoAgent) -> Router {
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .route("/", get(home).post(home))
        .route("/app", get(protected))
        .route("/app/{*rest}", get(protected))
        // Protocol endpoints (ACS, SSO, SLO, ...) are answered by the agent;
        // requests it lets through land here.
        .fallback(home)
        .layer(middleware::from_fn_with_state(agent, sso_agent_middleware))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .with_state(state)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "UP" })))
}

async fn home(
    State(state): State<AppState>,
    landing: Option<Extension<LandingRedirect>>,
    session: Option<Extension<AgentSession>>,
) -> Response {
    if let Some(Extension(LandingRedirect(url))) = landing {
        return Redirect::to(&url).into_response();
    }

    let agent = &state.config().agent;
    let mut body = String::new();
    match logged_in(&state, session.as_ref().map(|s| &s.0)) {
        Some(bean) => {
            body.push_str(&format!("<p>Signed in as {}.</p>", html_escape(&subject(&bean))));
            body.push_str("<p><a href=\"/app\">Open the application</a></p>");
            if agent.saml2_enabled && agent.saml2.slo_enabled && bean.saml2.is_some() {
                body.push_str(&format!(
                    "<p><a href=\"{}\">Sign out</a></p>",
                    html_escape(&agent.saml2.slo_url)
                ));
            }
        }
        None => {
            body.push_str("<p>You are not signed in.</p>");
            if agent.saml2_enabled {
                body.push_str(&format!(
                    "<p><a href=\"{}\">Sign in with SAML</a> | <a href=\"{}\">Try passive sign-in</a></p>",
                    html_escape(&agent.saml2.sso_url),
                    html_escape(&agent.saml2.passive_authn_url),
                ));
            }
            if agent.openid_enabled {
                body.push_str(&format!(
                    "<form method=\"get\" action=\"{}\"><input name=\"{}\" placeholder=\"OpenID identifier\"/><button>Sign in with OpenID</button></form>",
                    html_escape(&agent.openid.login_url),
                    html_escape(&agent.openid.claimed_id_param),
                ));
            }
        }
    }
    page("Home", &body)
}

async fn protected(
    State(state): State<AppState>,
    landing: Option<Extension<LandingRedirect>>,
    session: Option<Extension<AgentSession>>,
) -> Response {
    if let Some(Extension(LandingRedirect(url))) = landing {
        return Redirect::to(&url).into_response();
    }

    let agent = &state.config().agent;
    let Some(bean) = logged_in(&state, session.as_ref().map(|s| &s.0)) else {
        let login = if agent.saml2_enabled {
            agent.saml2.sso_url.as_str()
        } else {
            agent.session_keys.landing_url.as_str()
        };
        return Redirect::to(login).into_response();
    };

    let mut body = format!("<p>Welcome, {}.</p><ul>", html_escape(&subject(&bean)));
    if let Some(saml2) = &bean.saml2 {
        for (name, values) in &saml2.attributes {
            body.push_str(&format!(
                "<li>{}: {}</li>",
                html_escape(name),
                html_escape(&values.join(", "))
            ));
        }
    }
    if let Some(openid) = &bean.openid {
        for (name, value) in &openid.attributes {
            body.push_str(&format!("<li>{}: {}</li>", html_escape(name), html_escape(value)));
        }
    }
    body.push_str("</ul>");
    if bean.access_token.is_some() {
        body.push_str("<p>An OAuth2 access token is held for this session.</p>");
    }
    page("Application", &body)
}

fn logged_in(state: &AppState, session: Option<&AgentSession>) -> Option<LoggedInSession> {
    let key = &state.config().agent.session_keys.logged_in;
    match session?.get_json(key) {
        Ok(bean) => bean,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable logged-in session bean");
            None
        }
    }
}

fn subject(bean: &LoggedInSession) -> String {
    bean.saml2
        .as_ref()
        .map(|s| s.subject.clone())
        .or_else(|| bean.openid.as_ref().map(|o| o.claimed_id.clone()))
        .unwrap_or_default()
}

fn page(title: &str, body: &str) -> Response {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>"
    ))
    .into_response()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
