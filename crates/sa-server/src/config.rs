//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use sa_core::AgentConfig;

/// Default name of the session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "SSOAGENTSESSION";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Name of the cookie carrying the session ID.
    pub session_cookie: String,

    /// Agent configuration for the protected application.
    pub agent: AgentConfig,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("SA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("SA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let session_cookie = std::env::var("SA_SESSION_COOKIE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

        let agent = AgentConfig::from_env()?;

        Ok(Self {
            host,
            port,
            session_cookie,
            agent,
        })
    }

    /// Creates a configuration for testing around the given agent settings.
    #[must_use]
    pub fn for_testing(agent: AgentConfig) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            agent,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            agent: AgentConfig::default(),
        }
    }
}
