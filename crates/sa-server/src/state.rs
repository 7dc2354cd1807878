//! Application state management.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::session::SessionStore;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Browser sessions.
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: ServerConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_cookie.clone()));
        Self {
            config: Arc::new(config),
            sessions,
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
