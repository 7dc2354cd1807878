//! Per-request context.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::session::{AgentSession, LoggedInSession};

/// Everything the classifier and the collaborators may read about a request.
///
/// Built once per request and dropped when the request leaves the agent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    session: Option<AgentSession>,
    config: Arc<AgentConfig>,
}

impl RequestContext {
    /// Creates a context without parameters or session.
    pub fn new(method: Method, path: impl Into<String>, config: Arc<AgentConfig>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            form: HashMap::new(),
            session: None,
            config,
        }
    }

    /// Adds parameters from a raw query string.
    #[must_use]
    pub fn with_query(mut self, raw: &str) -> Self {
        merge_pairs(&mut self.query, raw.as_bytes());
        self
    }

    /// Adds parameters from an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        merge_pairs(&mut self.form, body);
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Attaches the browser session.
    #[must_use]
    pub fn with_session(mut self, session: AgentSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the agent configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the shared configuration handle.
    #[must_use]
    pub fn config_arc(&self) -> &Arc<AgentConfig> {
        &self.config
    }

    /// Returns the attached session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&AgentSession> {
        self.session.as_ref()
    }

    /// Looks up a parameter, query string first, then form body.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .or_else(|| self.form.get(name))
            .map(String::as_str)
    }

    /// Returns whether a parameter is present.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Returns every parameter whose name starts with `prefix`.
    pub fn params_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let form_only = self
            .form
            .iter()
            .filter(move |(k, _)| !self.query.contains_key(*k));
        self.query
            .iter()
            .chain(form_only)
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns whether the request path ends with a configured endpoint.
    ///
    /// An empty endpoint never matches.
    #[must_use]
    pub fn path_ends_with(&self, endpoint: &str) -> bool {
        !endpoint.is_empty() && self.path.ends_with(endpoint)
    }

    /// Reads the logged-in session bean.
    pub fn logged_in(&self) -> AgentResult<Option<LoggedInSession>> {
        match &self.session {
            Some(session) => Ok(session.get_json(&self.config.session_keys.logged_in)?),
            None => Ok(None),
        }
    }

    /// Reads the logged-in session bean, treating its absence as expiry.
    pub fn require_logged_in(&self) -> AgentResult<LoggedInSession> {
        self.logged_in()?.ok_or(AgentError::SessionExpired)
    }

    /// Stores the logged-in session bean.
    pub fn store_logged_in(&self, bean: &LoggedInSession) -> AgentResult<()> {
        let session = self.session.as_ref().ok_or_else(|| {
            AgentError::Internal("no session attached to the request".to_string())
        })?;
        session.set_json(&self.config.session_keys.logged_in, bean)?;
        Ok(())
    }

    /// Removes the logged-in session bean. Returns whether a session existed.
    pub fn clear_logged_in(&self) -> bool {
        match &self.session {
            Some(session) => {
                session.remove_attribute(&self.config.session_keys.logged_in);
                true
            }
            None => false,
        }
    }
}

fn merge_pairs(target: &mut HashMap<String, String>, raw: &[u8]) {
    for (key, value) in url::form_urlencoded::parse(raw) {
        target.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
}
