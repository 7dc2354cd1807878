//! Direct verification of positive assertions.
//!
//! Without an association the relying party asks the provider itself
//! whether an assertion is genuine (`openid.mode=check_authentication`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{OpenIdError, OpenIdResult};
use crate::message::MODE;

/// Confirms assertions with the OpenID provider.
#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    /// Returns whether the provider confirms the assertion `fields`.
    async fn verify(&self, op_endpoint: &str, fields: &[(String, String)]) -> OpenIdResult<bool>;
}

/// Verifier that performs `check_authentication` over HTTP.
#[derive(Debug, Clone)]
pub struct DirectVerifier {
    client: reqwest::Client,
}

impl DirectVerifier {
    /// Creates a verifier with the given request timeout.
    pub fn new(timeout: Duration) -> OpenIdResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssertionVerifier for DirectVerifier {
    async fn verify(&self, op_endpoint: &str, fields: &[(String, String)]) -> OpenIdResult<bool> {
        let form = check_authentication_form(fields);

        let response = self.client.post(op_endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(OpenIdError::VerificationFailed(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let values = parse_key_value(&body);
        if let Some(handle) = values.get("invalidate_handle") {
            tracing::debug!(handle = %handle, "Provider invalidated association handle");
        }
        Ok(values.get("is_valid").is_some_and(|v| v == "true"))
    }
}

/// Copies the assertion with the mode switched to `check_authentication`.
#[must_use]
pub fn check_authentication_form(fields: &[(String, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(k, v)| {
            if k == MODE {
                (k.clone(), "check_authentication".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Parses a key-value form encoded body (`key:value` per line).
#[must_use]
pub fn parse_key_value(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
