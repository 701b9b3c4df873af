//! zm-web: browser chat surface for Zoominary
//!
//! Serves a single page with a sidebar for loading a transcript directory
//! and a chat panel for questions, plus a small JSON API over the same
//! sessions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zm_core::{Config, GeminiClient, PrimingOptions};
//! use zm_web::{AppState, WebServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let model = Arc::new(GeminiClient::new(&config.llm)?);
//!     let priming = PrimingOptions::from_config(&config.primer)?;
//!
//!     let server = WebServer::new(config.web, AppState::new(model, priming));
//!     server.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod render;
pub mod routes;
pub mod server;

pub use error::{Result, WebError};
pub use handlers::SESSION_COOKIE;
pub use server::{AppState, WebServer, create_router, socket_addr};
