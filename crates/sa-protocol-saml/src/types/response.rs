//! Inbound SAML responses.
//!
//! The assertion consumer URL receives either an authentication
//! `Response` or, after SP-initiated logout, a `LogoutResponse`.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{status_codes, sub_status_codes};
use crate::error::{SamlError, SamlResult};
use crate::xml::{find_all, find_element, root_name, Element};

/// Status carried by a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// Top-level status code URI.
    pub code: String,
    /// Second-level status code URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_code: Option<String>,
    /// Status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseStatus {
    /// Returns whether the top-level code is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == status_codes::SUCCESS
    }

    /// Returns whether the IdP declined a passive request.
    #[must_use]
    pub fn is_no_passive(&self) -> bool {
        self.sub_code.as_deref() == Some(sub_status_codes::NO_PASSIVE)
    }

    /// Converts a non-success status into an error.
    pub fn into_error(self) -> SamlError {
        SamlError::UnsuccessfulStatus {
            code: self.sub_code.unwrap_or(self.code),
            message: self.message,
        }
    }

    fn parse(parent: &str) -> SamlResult<Self> {
        let status = find_element(parent, "Status", 0)
            .ok_or_else(|| SamlError::MissingElement("Status".to_string()))?;
        let top = find_element(status.content, "StatusCode", 0)
            .ok_or_else(|| SamlError::MissingElement("StatusCode".to_string()))?;
        let code = top
            .attribute("Value")
            .ok_or_else(|| SamlError::MissingElement("StatusCode/@Value".to_string()))?;

        Ok(Self {
            code,
            sub_code: find_element(top.content, "StatusCode", 0).and_then(|el| el.attribute("Value")),
            message: find_element(status.content, "StatusMessage", 0).map(|el| el.text()),
        })
    }
}

/// An authentication response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlResponse {
    /// Response ID.
    pub id: String,
    /// ID of the AuthnRequest this answers, absent for IdP-initiated SSO.
    pub in_response_to: Option<String>,
    /// Issuing identity provider.
    pub issuer: Option<String>,
    /// Destination the IdP addressed the response to.
    pub destination: Option<String>,
    /// Response status.
    pub status: ResponseStatus,
    /// NameID of the assertion subject.
    pub subject: Option<String>,
    /// Session index from the authentication statement.
    pub session_index: Option<String>,
    /// Attribute statement values.
    pub attributes: Vec<(String, Vec<String>)>,
    /// The assertion element exactly as received.
    pub assertion_xml: Option<String>,
}

impl SamlResponse {
    /// Returns the assertion base64 encoded, as carried in bearer grants.
    #[must_use]
    pub fn assertion_base64(&self) -> Option<String> {
        self.assertion_xml
            .as_deref()
            .map(|xml| base64::engine::general_purpose::STANDARD.encode(xml))
    }

    fn parse(root: &Element<'_>) -> SamlResult<Self> {
        let status = ResponseStatus::parse(root.content)?;
        let issuer = find_element(root.content, "Issuer", 0).map(|el| el.text());

        let assertion = find_element(root.content, "Assertion", 0);
        if assertion.is_none()
            && status.is_success()
            && find_element(root.content, "EncryptedAssertion", 0).is_some()
        {
            return Err(SamlError::InvalidResponse(
                "encrypted assertions are not supported".to_string(),
            ));
        }

        let mut response = Self {
            id: root
                .attribute("ID")
                .ok_or_else(|| SamlError::MissingElement("Response/@ID".to_string()))?,
            in_response_to: root.attribute("InResponseTo"),
            issuer,
            destination: root.attribute("Destination"),
            status,
            subject: None,
            session_index: None,
            attributes: Vec::new(),
            assertion_xml: None,
        };

        if let Some(assertion) = assertion {
            response.subject = find_element(assertion.content, "Subject", 0)
                .and_then(|subject| find_element(subject.content, "NameID", 0))
                .map(|el| el.text());
            response.session_index = find_element(assertion.content, "AuthnStatement", 0)
                .and_then(|el| el.attribute("SessionIndex"));
            response.attributes = find_all(assertion.content, "Attribute")
                .iter()
                .filter_map(|attr| {
                    let name = attr.attribute("Name")?;
                    let values = find_all(attr.content, "AttributeValue")
                        .iter()
                        .map(Element::text)
                        .collect();
                    Some((name, values))
                })
                .collect();
            response.assertion_xml = Some(assertion.outer.to_string());
        }

        Ok(response)
    }
}

/// A message received on the assertion consumer URL.
#[derive(Debug, Clone)]
pub enum InboundResponse {
    /// Authentication response.
    Response(SamlResponse),
    /// Response to an SP-initiated logout.
    LogoutResponse(ResponseStatus),
}

impl InboundResponse {
    /// Parses a decoded `SAMLResponse`.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let name = root_name(xml)
            .ok_or_else(|| SamlError::InvalidResponse("not an XML document".to_string()))?;
        let root = find_element(xml, name, 0)
            .ok_or_else(|| SamlError::InvalidResponse(format!("malformed {name} element")))?;

        match name {
            "Response" => Ok(Self::Response(SamlResponse::parse(&root)?)),
            "LogoutResponse" => Ok(Self::LogoutResponse(ResponseStatus::parse(root.content)?)),
            other => Err(SamlError::InvalidResponse(format!(
                "unexpected message {other}"
            ))),
        }
    }
}
