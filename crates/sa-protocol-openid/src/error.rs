//! OpenID error types.

use sa_core::{AgentError, ProtocolKind};
use thiserror::Error;

/// Result type for OpenID operations.
pub type OpenIdResult<T> = Result<T, OpenIdError>;

/// OpenID 2.0 relying party errors.
#[derive(Debug, Error)]
pub enum OpenIdError {
    /// A required `openid.*` parameter is missing.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// The user cancelled at the provider.
    #[error("authentication cancelled by the user")]
    Cancelled,

    /// The provider answered `openid.mode=error`.
    #[error("provider error: {0}")]
    Provider(String),

    /// The response carried an unknown mode.
    #[error("unexpected openid.mode: {0}")]
    UnexpectedMode(String),

    /// `openid.return_to` does not belong to this relying party.
    #[error("return_to mismatch: expected {expected}, got {actual}")]
    ReturnToMismatch {
        /// Configured return URL.
        expected: String,
        /// Return URL found in the assertion.
        actual: String,
    },

    /// The assertion names a provider other than the configured one.
    #[error("op_endpoint mismatch: expected {expected}, got {actual}")]
    EndpointMismatch {
        /// Configured provider endpoint.
        expected: String,
        /// Endpoint named in the assertion.
        actual: String,
    },

    /// The provider did not confirm the assertion.
    #[error("assertion verification failed: {0}")]
    VerificationFailed(String),

    /// A configured URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl OpenIdError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MissingParameter(_) | Self::UnexpectedMode(_) | Self::InvalidUrl(_) => 400,
            Self::Cancelled
            | Self::Provider(_)
            | Self::ReturnToMismatch { .. }
            | Self::EndpointMismatch { .. }
            | Self::VerificationFailed(_) => 401,
            Self::Http(_) => 502,
        }
    }
}

impl From<url::ParseError> for OpenIdError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<OpenIdError> for AgentError {
    fn from(err: OpenIdError) -> Self {
        Self::Protocol {
            protocol: ProtocolKind::OpenId,
            status: err.http_status(),
            message: err.to_string(),
        }
    }
}
