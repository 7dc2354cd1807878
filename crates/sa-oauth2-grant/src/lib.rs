//! SAML2 bearer assertion grant for the SSO agent.
//!
//! Exchanges the SAML assertion kept in the logged-in session for an OAuth2
//! access token (RFC 7522) and stores the token next to the login.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod grant;

pub use error::{GrantError, GrantResult};
pub use grant::{grant_form, SamlBearerGrant, TokenResponse, SAML2_BEARER_GRANT_TYPE};
