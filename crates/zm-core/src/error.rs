//! Error types for zm-core

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for zm-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot access transcript directory {}: {source}", path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No transcript files found in {}", .0.display())]
    NoTranscripts(PathBuf),

    #[error("Failed to read transcript {}: {source}", path.display())]
    TranscriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error processing transcript files: {0}")]
    Priming(#[source] RemoteError),

    #[error("Error during chat: {0}")]
    ChatTurn(#[source] RemoteError),

    #[error("Chat has not been started; load a transcript directory first")]
    ChatNotStarted,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryAccess { .. }
                | Self::NoTranscripts(_)
                | Self::TranscriptRead { .. }
                | Self::ChatNotStarted
                | Self::EmptyMessage
                | Self::SessionNotFound(_)
        )
    }
}

/// Failure talking to the hosted model
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Model API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Transient failures that are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::Quota(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Blocked(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Result type alias for zm-core
pub type Result<T> = std::result::Result<T, Error>;
