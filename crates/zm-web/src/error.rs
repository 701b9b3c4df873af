//! Error types for zm-web

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// zm-web error type
#[derive(Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Core(#[from] zm_core::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WebError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        use zm_core::Error as Core;

        match self {
            Self::Core(Core::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(Core::ChatNotStarted) => StatusCode::CONFLICT,
            Self::Core(Core::Priming(_) | Core::ChatTurn(_)) => StatusCode::BAD_GATEWAY,
            Self::Core(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WebError>;
