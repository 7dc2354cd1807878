//! OpenID 2.0 relying party collaborator for the SSO agent.
//!
//! - [`message`] - `checkid_setup` requests and positive assertions
//! - [`verifier`] - Direct verification against the OpenID provider
//! - [`manager`] - [`OpenIdManager`], the [`sa_core::OpenIdHandler`] implementation
//! - [`error`] - Error types for OpenID operations
//!
//! Discovery and association negotiation are not implemented; the provider
//! endpoint is configured and every assertion is verified directly
//! (stateless mode).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod manager;
pub mod message;
pub mod verifier;

pub use error::{OpenIdError, OpenIdResult};
pub use manager::OpenIdManager;
pub use message::{CheckIdRequest, PositiveAssertion};
pub use verifier::{AssertionVerifier, DirectVerifier};
