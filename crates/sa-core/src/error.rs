//! Error handling for the SSO agent.
//!
//! Collaborator crates keep their own error enums and convert into
//! [`AgentError`] at the collaborator boundary. The dispatcher only ever
//! reasons about the variants defined here.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Result type alias using the agent error type.
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Federation protocol that raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// SAML 2.0 web SSO or single logout.
    Saml2,
    /// OpenID 2.0 login.
    OpenId,
    /// SAML2 bearer assertion to OAuth2 token exchange.
    OAuth2Grant,
}

impl ProtocolKind {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Saml2 => "saml2",
            Self::OpenId => "openid",
            Self::OAuth2Grant => "oauth2-grant",
        }
    }
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Shared configuration or a required collaborator is not available.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Configuration was present but could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Session-bound authentication state is missing or no longer valid.
    ///
    /// This is an expected condition: the dispatcher turns it into a
    /// landing-view redirect instead of surfacing it.
    #[error("session expired or user already logged out")]
    SessionExpired,

    /// A collaborator rejected a protocol message.
    #[error("{protocol} protocol failure: {message}")]
    Protocol {
        /// Protocol that failed.
        protocol: ProtocolKind,
        /// Failure description.
        message: String,
        /// HTTP status to report to the hosting environment.
        status: u16,
    },

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Creates a protocol failure reported as `400 Bad Request`.
    pub fn protocol(protocol: ProtocolKind, message: impl Into<String>) -> Self {
        Self::Protocol {
            protocol,
            message: message.into(),
            status: 400,
        }
    }

    /// Returns whether this is a protocol-level failure.
    #[must_use]
    pub const fn is_protocol_failure(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns whether the dispatcher recovers from this error on its own.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Protocol { status, .. } => *status,
            Self::SessionExpired => 401,
            Self::ConfigurationMissing(_) | Self::InvalidConfiguration(_) | Self::Internal(_) => {
                500
            }
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("session bean serialization: {err}"))
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Configuration and internal details stay in the logs.
        let message = match &self {
            Self::Protocol { .. } | Self::SessionExpired => self.to_string(),
            _ => "internal error".to_string(),
        };

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Authentication Error</title></head>
<body>
<h1>Authentication Error</h1>
<p>{}</p>
</body>
</html>"#,
            html_escape(&message)
        );
        (status, Html(html)).into_response()
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
