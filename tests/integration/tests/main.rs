//! End-to-End Integration Tests
//!
//! `agent_flows` drives the agent middleware with recording collaborators;
//! the remaining modules run the demo server on a local port and talk to it
//! over HTTP with a cookie-keeping client.

mod agent_flows;
mod common;
mod oauth2_grant;
mod saml_sso;
