//! Web server configuration and startup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use zm_core::{ChatModel, PrimingOptions, SessionManager, WebConfig};

use crate::error::{Result, WebError};
use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ChatModel>,
    pub sessions: Arc<SessionManager>,
    pub priming: Arc<PrimingOptions>,
}

impl AppState {
    pub fn new(model: Arc<dyn ChatModel>, priming: PrimingOptions) -> Self {
        Self {
            model,
            sessions: Arc::new(SessionManager::new()),
            priming: Arc::new(priming),
        }
    }

    /// Use `sessions` instead of a manager that never expires sessions
    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Get the socket address for a web configuration
pub fn socket_addr(config: &WebConfig) -> Result<SocketAddr> {
    let addr = format!("{}:{}", config.host, config.port);
    addr.parse()
        .map_err(|e| WebError::ConfigError(format!("Invalid address {}: {}", addr, e)))
}

/// Chat UI server
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    /// Create a new server
    pub fn new(config: WebConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the router
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = socket_addr(&self.config)?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::ServerError(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Zoominary listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WebError::ServerError(format!("Server error: {}", e)))?;

        info!("Web server stopped");
        Ok(())
    }
}
