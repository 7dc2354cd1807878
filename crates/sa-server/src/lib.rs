//! # sa-server
//!
//! Demo host for the SSO agent.
//!
//! Serves a small sample application behind the agent middleware, with
//! cookie-backed in-memory sessions and collaborators built from
//! [`AgentConfig`].
//!
//! ## Usage
//!
//! ```ignore
//! use sa_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! Server::new(config)?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod router;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use session::{session_middleware, SessionStore};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sa_agent::SsoAgent;
use sa_core::{AgentConfig, SessionRegistry};
use sa_oauth2_grant::SamlBearerGrant;
use sa_protocol_openid::OpenIdManager;
use sa_protocol_saml::Saml2SsoManager;
use tokio::net::TcpListener;

/// The demo server.
pub struct Server {
    state: AppState,
    agent: SsoAgent,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// This builds the protocol collaborators for every enabled protocol.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let agent = build_agent(&config.agent)?;
        Ok(Self {
            state: AppState::new(config),
            agent,
        })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.state.config();
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", addr);

        let app = create_router(self.state, self.agent);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        self.state.config()
    }

    /// Returns the agent.
    #[must_use]
    pub const fn agent(&self) -> &SsoAgent {
        &self.agent
    }

    /// Creates a test router without starting the server.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone(), self.agent.clone())
    }
}

/// Builds an agent with collaborators for every enabled protocol.
pub fn build_agent(config: &AgentConfig) -> anyhow::Result<SsoAgent> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let registry = Arc::new(SessionRegistry::new());

    let mut agent = SsoAgent::new()
        .with_config(config.clone())
        .with_saml(Arc::new(Saml2SsoManager::new(registry)));

    if config.openid_enabled {
        agent = agent.with_openid(Arc::new(OpenIdManager::direct(timeout)?));
    }
    if config.oauth2_grant_enabled {
        agent = agent.with_grant(Arc::new(SamlBearerGrant::new(timeout)?));
    }

    tracing::info!(
        saml2 = config.saml2_enabled,
        openid = config.openid_enabled,
        oauth2_grant = config.oauth2_grant_enabled,
        "SSO agent configured"
    );
    Ok(agent)
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
