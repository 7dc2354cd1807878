//! SAML error types.
//!
//! Provides error types for building outbound messages and for decoding and
//! checking inbound responses and logout requests.

use sa_core::{AgentError, ProtocolKind};
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid SAML response format or content.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// The IdP answered with a non-success status.
    #[error("unsuccessful status {code}: {}", message.as_deref().unwrap_or("no status message"))]
    UnsuccessfulStatus {
        /// Top-level (or most specific) status code.
        code: String,
        /// Status message, if the IdP sent one.
        message: Option<String>,
    },

    /// Invalid issuer.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// The expected issuer.
        expected: String,
        /// The actual issuer.
        actual: String,
    },

    /// Invalid destination.
    #[error("invalid destination: expected {expected}, got {actual}")]
    InvalidDestination {
        /// The expected destination URL.
        expected: String,
        /// The actual destination URL.
        actual: String,
    },

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::MissingElement(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_) => 400,
            Self::UnsuccessfulStatus { .. }
            | Self::InvalidIssuer { .. }
            | Self::InvalidDestination { .. } => 401,
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<SamlError> for AgentError {
    fn from(err: SamlError) -> Self {
        Self::Protocol {
            protocol: ProtocolKind::Saml2,
            status: err.http_status(),
            message: err.to_string(),
        }
    }
}
