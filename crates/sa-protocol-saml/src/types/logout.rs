//! SAML Single Logout request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SAMLP_NS, SAML_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::{escape, find_all, find_element, root_name};

/// SAML Logout Request.
///
/// Built by the service provider for SP-initiated logout and parsed when
/// the identity provider propagates a logout started elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The URL where this request was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The name identifier of the principal to log out.
    pub name_id: String,

    /// Format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_format: Option<String>,

    /// Session indexes to terminate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session_indexes: Vec<String>,

    /// Reason for the logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LogoutRequest {
    /// User logout reason.
    pub const REASON_USER: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:user";

    /// Creates a new logout request.
    #[must_use]
    pub fn new(issuer: impl Into<String>, name_id: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id: name_id.into(),
            name_id_format: None,
            session_indexes: Vec::new(),
            reason: None,
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the name ID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Adds a session index to terminate.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Sets the logout reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Serializes the request.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut attrs = format!(
            r#"ID="{}" Version="2.0" IssueInstant="{}""#,
            escape(&self.id),
            self.issue_instant.format("%Y-%m-%dT%H:%M:%SZ"),
        );
        if let Some(destination) = &self.destination {
            attrs.push_str(&format!(r#" Destination="{}""#, escape(destination)));
        }
        if let Some(reason) = &self.reason {
            attrs.push_str(&format!(r#" Reason="{}""#, escape(reason)));
        }

        let format_attr = self
            .name_id_format
            .as_deref()
            .map(|f| format!(r#" Format="{}""#, escape(f)))
            .unwrap_or_default();

        let session_indexes: String = self
            .session_indexes
            .iter()
            .map(|index| format!("<samlp:SessionIndex>{}</samlp:SessionIndex>", escape(index)))
            .collect();

        format!(
            r#"<samlp:LogoutRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" {attrs}><saml:Issuer>{}</saml:Issuer><saml:NameID{format_attr}>{}</saml:NameID>{session_indexes}</samlp:LogoutRequest>"#,
            escape(&self.issuer),
            escape(&self.name_id),
        )
    }

    /// Parses a logout request sent by the identity provider.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        if root_name(xml) != Some("LogoutRequest") {
            return Err(SamlError::InvalidRequest(
                "expected a LogoutRequest message".to_string(),
            ));
        }
        let root = find_element(xml, "LogoutRequest", 0)
            .ok_or_else(|| SamlError::InvalidRequest("malformed LogoutRequest".to_string()))?;

        let id = root
            .attribute("ID")
            .ok_or_else(|| SamlError::MissingElement("LogoutRequest/@ID".to_string()))?;
        let issuer = find_element(root.content, "Issuer", 0)
            .map(|el| el.text())
            .unwrap_or_default();
        let name_id = find_element(root.content, "NameID", 0)
            .ok_or_else(|| SamlError::MissingElement("NameID".to_string()))?;

        Ok(Self {
            id,
            // The IdP's IssueInstant is informational only.
            issue_instant: Utc::now(),
            issuer,
            destination: root.attribute("Destination"),
            name_id: name_id.text(),
            name_id_format: name_id.attribute("Format"),
            session_indexes: find_all(root.content, "SessionIndex")
                .iter()
                .map(|el| el.text())
                .collect(),
            reason: root.attribute("Reason"),
        })
    }
}
