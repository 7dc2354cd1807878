//! Grant error types.

use sa_core::{AgentError, ProtocolKind};
use thiserror::Error;

/// Result type for grant operations.
pub type GrantResult<T> = Result<T, GrantError>;

/// Errors from the SAML2 bearer grant.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The assertion in the session could not be decoded.
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    /// The token endpoint answered with an OAuth2 error.
    #[error("token endpoint error {error}: {}", description.as_deref().unwrap_or("no description"))]
    TokenEndpoint {
        /// OAuth2 error code.
        error: String,
        /// Human-readable description.
        description: Option<String>,
    },

    /// The token endpoint answered with an unexpected status or body.
    #[error("unexpected token endpoint response: {0}")]
    UnexpectedResponse(String),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GrantError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidAssertion(_) => 400,
            Self::TokenEndpoint { .. } => 401,
            Self::UnexpectedResponse(_) | Self::Http(_) => 502,
        }
    }
}

impl From<GrantError> for AgentError {
    fn from(err: GrantError) -> Self {
        Self::Protocol {
            protocol: ProtocolKind::OAuth2Grant,
            status: err.http_status(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_error_message() {
        let err = GrantError::TokenEndpoint {
            error: "invalid_grant".into(),
            description: Some("assertion expired".into()),
        };
        assert_eq!(err.to_string(), "token endpoint error invalid_grant: assertion expired");

        let agent: AgentError = err.into();
        assert_eq!(agent.http_status(), 401);
    }
}
