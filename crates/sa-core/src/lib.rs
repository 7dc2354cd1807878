//! # sa-core
//!
//! Core types shared by every SSO agent crate.
//!
//! This crate provides:
//!
//! - [`config`] - Agent configuration (protocol settings, skip patterns, session keys)
//! - [`error`] - The agent error taxonomy and its HTTP mapping
//! - [`context`] - The per-request view handed to classifiers and collaborators
//! - [`session`] - Session attribute bags and the SAML session-index registry
//! - [`protocol`] - Collaborator interfaces, one per federation protocol

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod protocol;
pub mod session;

pub use config::{AgentConfig, OAuth2Config, OpenIdConfig, Saml2Config, SessionKeys, SkipPatterns};
pub use context::RequestContext;
pub use error::{AgentError, AgentResult, ProtocolKind};
pub use protocol::{AuthPayload, HttpBinding, OpenIdHandler, SamlGrantHandler, SamlSsoHandler};
pub use session::{
    AccessToken, AgentSession, LoggedInSession, OpenIdLogin, Saml2Login, SessionRegistry,
};
