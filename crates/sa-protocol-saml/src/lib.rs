//! SAML 2.0 service provider collaborator for the SSO agent.
//!
//! This crate provides the SAML side of the agent:
//!
//! - **AuthnRequest and LogoutRequest construction** - Messages sent to the IdP
//! - **POST and Redirect bindings** - Encoding outbound and decoding inbound messages
//! - **Response handling** - Status, issuer, subject, session index and attributes
//! - **Single Logout** - IdP-initiated logout through the session-index registry
//!
//! # Architecture
//!
//! - [`types`] - SAML message types and constants
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`manager`] - [`Saml2SsoManager`], the [`sa_core::SamlSsoHandler`] implementation
//! - [`error`] - Error types for SAML operations
//!
//! XML signature validation and assertion decryption are not performed here.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sa_core::SessionRegistry;
//! use sa_protocol_saml::Saml2SsoManager;
//!
//! let saml = Arc::new(Saml2SsoManager::new(Arc::new(SessionRegistry::new())));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod error;
pub mod manager;
pub mod types;
mod xml;

pub use error::{SamlError, SamlResult};
pub use manager::Saml2SsoManager;
pub use types::*;
