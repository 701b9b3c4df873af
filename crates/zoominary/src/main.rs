//! zoominary: Zoom transcript chat assistant
//!
//! Usage:
//!   zoominary                    - Start the chat UI
//!   zoominary --config <path>    - Start with an explicit config file
//!   zoominary --help             - Show help

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use zm_core::{ChatModel, Config, GeminiClient, PrimingOptions, SessionManager};
use zm_web::{AppState, WebServer};

/// Run mode
#[derive(Debug, PartialEq)]
enum RunMode {
    /// Serve the chat UI
    Server { config: Option<PathBuf> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1)).map_err(|e| anyhow::anyhow!(e))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("zoominary {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config } => config,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    let client = GeminiClient::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;
    let priming = PrimingOptions::from_config(&config.primer)
        .map_err(|e| anyhow::anyhow!("Failed to load priming instruction: {}", e))?;

    tracing::info!("Starting zoominary...");
    tracing::info!("Model: {}", client.name());
    if priming.instruction.is_none() {
        tracing::warn!("No priming instruction configured; transcripts are sent without one");
    }

    let sessions =
        SessionManager::with_max_idle(Duration::from_secs(config.web.session_idle_secs));
    let state = AppState::new(Arc::new(client), priming).with_sessions(sessions);
    let server = WebServer::new(config.web, state);

    tracing::info!("Press Ctrl+C to exit");
    server.run(shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> Result<RunMode, String>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("{} requires a path", arg))?;
                config = Some(PathBuf::from(path));
            }
            other => return Err(format!("Unknown argument: {} (see --help)", other)),
        }
    }

    Ok(RunMode::Server { config })
}

/// Print help message
fn print_help() {
    println!("zoominary - Chat with your Zoom call transcripts");
    println!();
    println!("Usage:");
    println!("  zoominary                  Start the chat UI");
    println!("  zoominary --config <path>  Read configuration from <path>");
    println!("  zoominary --help           Show this help message");
    println!("  zoominary --version        Show version");
    println!();
    println!("Without --config, zoominary.toml in the working directory is used if present.");
    println!();
    println!("Environment Variables:");
    println!("  GEMINI_API_KEY           API key (required, LLM_API_KEY also accepted)");
    println!("  LLM_MODEL                Model name (default: gemini-1.5-flash)");
    println!("  LLM_BASE_URL             Custom API endpoint");
    println!("  LLM_TIMEOUT_SECS         Request timeout in seconds (default: 120)");
    println!("  LLM_MAX_RETRIES          Retries for transient failures (default: 1)");
    println!("  PRIMER_INSTRUCTION       Priming instruction text");
    println!("  PRIMER_INSTRUCTION_PATH  File containing the priming instruction");
    println!("  SHOW_PRIMING_REPLY       Show the reply to the priming message (default: false)");
    println!("  WEB_HOST                 Listen address (default: 127.0.0.1)");
    println!("  WEB_PORT                 Listen port (default: 8501)");
    println!("  WEB_SESSION_IDLE_SECS    Drop sessions idle this long, 0 = never (default: 3600)");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    tracing::info!("Shutting down...");
}
