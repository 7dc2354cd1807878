//! Session state owned by the hosting environment.
//!
//! The host attaches an [`AgentSession`] to every request that belongs to a
//! browser session. The agent only reads, writes, or clears the logged-in
//! bean stored under [`SessionKeys::logged_in`](crate::SessionKeys).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// A browser session's attribute bag.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Debug, Clone)]
pub struct AgentSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: Uuid,
    attributes: RwLock<HashMap<String, String>>,
    invalidated: RwLock<bool>,
}

impl AgentSession {
    /// Creates a new, empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7())
    }

    /// Creates a session with a known identifier.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                attributes: RwLock::new(HashMap::new()),
                invalidated: RwLock::new(false),
            }),
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Sets a session attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.attributes.write().insert(key.into(), value.into());
    }

    /// Gets a session attribute.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<String> {
        self.inner.attributes.read().get(key).cloned()
    }

    /// Removes a session attribute.
    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        self.inner.attributes.write().remove(key)
    }

    /// Stores a serde value as a JSON attribute.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(value)?;
        self.set_attribute(key, json);
        Ok(())
    }

    /// Reads a JSON attribute back into a serde value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get_attribute(key)
            .map(|json| serde_json::from_str(&json))
            .transpose()
    }

    /// Drops every attribute and marks the session unusable.
    ///
    /// Hosts should discard invalidated sessions instead of attaching them
    /// to further requests.
    pub fn invalidate(&self) {
        self.inner.attributes.write().clear();
        *self.inner.invalidated.write() = true;
    }

    /// Returns whether the session has been invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        *self.inner.invalidated.read()
    }

    /// Returns whether no attribute has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.attributes.read().is_empty()
    }

    /// Returns whether two handles refer to the same session.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for AgentSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The authenticated-session bean stored in a session after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedInSession {
    /// SAML 2.0 login details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saml2: Option<Saml2Login>,

    /// OpenID 2.0 login details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<OpenIdLogin>,

    /// Access token obtained through the SAML2 bearer grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
}

/// Subject and assertion of a SAML 2.0 login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saml2Login {
    /// NameID of the authenticated subject.
    pub subject: String,
    /// IdP session index, used to correlate single logout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,
    /// The raw assertion XML, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    /// Attribute statements (name, values).
    #[serde(default)]
    pub attributes: Vec<(String, Vec<String>)>,
}

/// Claimed identity of an OpenID 2.0 login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdLogin {
    /// The verified claimed identifier.
    pub claimed_id: String,
    /// Attribute exchange values (type alias, value).
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

/// OAuth2 access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The access token.
    pub access_token: String,
    /// Token type, usually `Bearer`.
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Process-wide map from SAML session index to the sessions that logged in
/// under it.
///
/// Identity-provider initiated logout arrives on an unrelated request, so
/// the sessions to terminate have to be found by session index.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    by_index: DashMap<String, Vec<AgentSession>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under an IdP session index.
    ///
    /// Sessions invalidated elsewhere since the last call are dropped first.
    pub fn register(&self, session_index: impl Into<String>, session: AgentSession) {
        self.prune();
        let mut entry = self.by_index.entry(session_index.into()).or_default();
        if !entry.iter().any(|s| s.same_session(&session)) {
            entry.push(session);
        }
    }

    /// Invalidates and forgets every session registered under the index.
    ///
    /// Returns the number of sessions invalidated.
    pub fn invalidate(&self, session_index: &str) -> usize {
        match self.by_index.remove(session_index) {
            Some((_, sessions)) => {
                for session in &sessions {
                    session.invalidate();
                }
                sessions.len()
            }
            None => 0,
        }
    }

    /// Forgets one session registered under the index without invalidating it.
    ///
    /// Returns whether the session was tracked.
    pub fn remove(&self, session_index: &str, session: &AgentSession) -> bool {
        let mut removed = false;
        self.by_index.remove_if_mut(session_index, |_, sessions| {
            let before = sessions.len();
            sessions.retain(|s| !s.same_session(session));
            removed = sessions.len() != before;
            sessions.is_empty()
        });
        removed
    }

    fn prune(&self) {
        self.by_index.retain(|_, sessions| {
            sessions.retain(|s| !s.is_invalidated());
            !sessions.is_empty()
        });
    }

    /// Returns the number of tracked session indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    /// Returns whether no session index is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}
