//! Cookie-backed in-memory sessions.
//!
//! Every request leaving [`session_middleware`] carries an [`AgentSession`]
//! extension. A fresh session is only stored, and its cookie only issued,
//! once something has been written to it. Sessions invalidated by single
//! logout are dropped from the store and their cookie is expired.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use sa_core::AgentSession;
use uuid::Uuid;

/// In-memory session store keyed by the session cookie.
#[derive(Debug)]
pub struct SessionStore {
    cookie_name: String,
    sessions: DashMap<Uuid, AgentSession>,
}

impl SessionStore {
    /// Creates an empty store using the given cookie name.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            sessions: DashMap::new(),
        }
    }

    /// Returns the cookie name.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Looks up a live session. Invalidated sessions are evicted.
    pub fn get(&self, id: &Uuid) -> Option<AgentSession> {
        let session = self.sessions.get(id).map(|s| s.value().clone())?;
        if session.is_invalidated() {
            self.sessions.remove(id);
            return None;
        }
        Some(session)
    }

    /// Creates and stores a new session.
    pub fn create(&self) -> AgentSession {
        let session = AgentSession::new();
        self.insert(session.clone());
        session
    }

    /// Stores a session under its own ID.
    pub fn insert(&self, session: AgentSession) {
        self.sessions.insert(session.id(), session);
    }

    /// Removes a session.
    pub fn remove(&self, id: &Uuid) {
        self.sessions.remove(id);
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Extracts the session ID from the `Cookie` header.
    #[must_use]
    pub fn session_id(&self, headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
    }

    fn cookie(&self, id: Uuid, expire: bool) -> Option<HeaderValue> {
        let value = if expire {
            format!("{}=; Path=/; HttpOnly; Max-Age=0", self.cookie_name)
        } else {
            format!("{}={id}; Path=/; HttpOnly", self.cookie_name)
        };
        HeaderValue::from_str(&value).ok()
    }
}

/// Attaches the browser session to the request.
pub async fn session_middleware(
    State(store): State<Arc<SessionStore>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let existing = store
        .session_id(request.headers())
        .and_then(|id| store.get(&id));
    let (session, stored) = match existing {
        Some(session) => (session, true),
        None => (AgentSession::new(), false),
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let cookie = if !stored {
        if session.is_invalidated() || session.is_empty() {
            None
        } else {
            store.insert(session.clone());
            store.cookie(session.id(), false)
        }
    } else if session.is_invalidated() {
        tracing::debug!(session_id = %session.id(), "Dropping invalidated session");
        store.remove(&session.id());
        store.cookie(session.id(), true)
    } else {
        None
    };
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}
