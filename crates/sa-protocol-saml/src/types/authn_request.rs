//! SAML AuthnRequest.
//!
//! Authentication request message sent by the service provider to the
//! identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sa_core::HttpBinding;

use super::{SAMLP_NS, SAML_NS};
use crate::xml::escape;

/// SAML Authentication Request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// The IdP endpoint this request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Binding the IdP should use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Requested name identifier format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_format: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,
}

impl AuthnRequest {
    /// Creates a new authentication request.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            destination: None,
            protocol_binding: None,
            name_id_format: None,
            force_authn: false,
            is_passive: false,
        }
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: HttpBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Sets the requested name ID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets passive authentication.
    #[must_use]
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
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
        if let Some(acs) = &self.assertion_consumer_service_url {
            attrs.push_str(&format!(r#" AssertionConsumerServiceURL="{}""#, escape(acs)));
        }
        if let Some(binding) = &self.protocol_binding {
            attrs.push_str(&format!(r#" ProtocolBinding="{}""#, escape(binding)));
        }
        if self.force_authn {
            attrs.push_str(r#" ForceAuthn="true""#);
        }
        if self.is_passive {
            attrs.push_str(r#" IsPassive="true""#);
        }

        let name_id_policy = self
            .name_id_format
            .as_deref()
            .map(|format| {
                format!(
                    r#"<samlp:NameIDPolicy Format="{}" AllowCreate="true"/>"#,
                    escape(format)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" {attrs}><saml:Issuer>{}</saml:Issuer>{name_id_policy}</samlp:AuthnRequest>"#,
            escape(&self.issuer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::find_element;

    #[test]
    fn authn_request_creation() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs_url("https://sp.example.com/acs")
            .with_destination("https://idp.example.com/sso")
            .with_binding(HttpBinding::Post)
            .force_authn(true);

        assert!(request.id.starts_with("_id"));
        assert_eq!(request.issuer, "https://sp.example.com");
        assert!(request.force_authn);
        assert!(!request.is_passive);
    }

    #[test]
    fn passive_flag_is_serialized() {
        let xml = AuthnRequest::new("sp").is_passive(true).to_xml();
        let root = find_element(&xml, "AuthnRequest", 0).unwrap();
        assert_eq!(root.attribute("IsPassive").as_deref(), Some("true"));
        assert!(root.attribute("ForceAuthn").is_none());

        let xml = AuthnRequest::new("sp").to_xml();
        let root = find_element(&xml, "AuthnRequest", 0).unwrap();
        assert!(root.attribute("IsPassive").is_none());
    }

    #[test]
    fn xml_carries_endpoints_and_policy() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs_url("https://sp.example.com/acs?a=1&b=2")
            .with_destination("https://idp.example.com/sso")
            .with_binding(HttpBinding::Post)
            .with_name_id_format("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress");
        let xml = request.to_xml();

        let root = find_element(&xml, "AuthnRequest", 0).unwrap();
        assert_eq!(root.attribute("ID"), Some(request.id.clone()));
        assert_eq!(
            root.attribute("AssertionConsumerServiceURL").as_deref(),
            Some("https://sp.example.com/acs?a=1&b=2")
        );
        assert_eq!(
            root.attribute("ProtocolBinding").as_deref(),
            Some(HttpBinding::Post.uri())
        );
        assert_eq!(
            find_element(&xml, "Issuer", 0).unwrap().text(),
            "https://sp.example.com"
        );
        assert!(find_element(&xml, "NameIDPolicy", 0).is_some());
    }
}
