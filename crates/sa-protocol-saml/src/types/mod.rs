//! SAML 2.0 message types used by a service provider.
//!
//! Outbound: [`AuthnRequest`], [`LogoutRequest`].
//! Inbound: [`InboundResponse`] (Response or LogoutResponse) and
//! [`LogoutRequest`] sent by the IdP.

mod authn_request;
mod constants;
mod logout;
mod response;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use response::*;
