//! SAML bindings used by the service provider.
//!
//! - **HTTP-POST Binding** - messages are base64-encoded and carried in an
//!   auto-submitting HTML form
//! - **HTTP-Redirect Binding** - messages are deflated, base64-encoded and
//!   URL-encoded into the query string
//!
//! # Usage
//!
//! ```rust,ignore
//! use sa_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let html = HttpPostBinding::encode_request(&xml, "https://idp.example.com/sso", Some("/app"));
//! let url = HttpRedirectBinding::encode_request(&xml, "https://idp.example.com/sso", Some("/app"))?;
//! ```

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use crate::types::params;

/// Whether a bound message travels in `SAMLRequest` or `SAMLResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest or LogoutRequest.
    Request,
    /// Response or LogoutResponse.
    Response,
}

impl SamlMessageType {
    /// Returns the parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => params::SAML_REQUEST,
            Self::Response => params::SAML_RESPONSE,
        }
    }
}

/// A message taken off a binding.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// Which parameter carried the message.
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
}

/// Picks the encoded value and its type from the two SAML parameters.
fn select_message<'a>(
    saml_request: Option<&'a str>,
    saml_response: Option<&'a str>,
) -> crate::SamlResult<(&'a str, SamlMessageType)> {
    match (saml_request, saml_response) {
        (Some(req), _) => Ok((req, SamlMessageType::Request)),
        (None, Some(resp)) => Ok((resp, SamlMessageType::Response)),
        (None, None) => Err(crate::SamlError::InvalidRequest(
            "no SAMLRequest or SAMLResponse parameter".to_string(),
        )),
    }
}

/// Strips whitespace some IdPs insert into long base64 values.
fn compact_base64(encoded: &str) -> String {
    encoded.chars().filter(|c| !c.is_whitespace()).collect()
}
