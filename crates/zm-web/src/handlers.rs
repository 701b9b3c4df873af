//! HTTP handlers
//!
//! Page handlers answer form posts with a redirect back to `/`, which
//! re-renders the whole page from session state. The JSON API exposes the
//! same operations for scripting.

use std::convert::Infallible;
use std::path::Path;

use axum::{
    Form, Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use zm_core::session::{SessionHandle, StartOutcome};
use zm_core::{ChatMessage, ChatSession, Error, Notice, NoticeArea, NoticeLevel};

use crate::error::{Result, WebError};
use crate::render::{self, PageView};
use crate::server::AppState;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "zoominary_session";

/// Session id sent by the browser, if any
pub struct SessionCookie(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .typed_get::<Cookie>()
            .and_then(|cookie| cookie.get(SESSION_COOKIE).map(str::to_string));
        Ok(Self(id))
    }
}

impl SessionCookie {
    /// Look up the session named by the cookie without creating one
    async fn existing(&self, state: &AppState) -> Option<(String, SessionHandle)> {
        let id = self.0.as_deref()?;
        let handle = state.sessions.get(id).await.ok()?;
        Some((id.to_string(), handle))
    }
}

/// Attach the session cookie unless the browser already sent it
fn with_session_cookie(mut response: Response, cookie: &SessionCookie, id: &str) -> Response {
    if cookie.0.as_deref() != Some(id) {
        let value = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

fn clear_session_cookie(mut response: Response) -> Response {
    let value = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

async fn start_session(
    state: &AppState,
    session: &mut ChatSession,
    directory: &str,
) -> zm_core::Result<StartOutcome> {
    session
        .start(state.model.as_ref(), Path::new(directory), &state.priming)
        .await
}

fn start_error_notice(err: &Error) -> Notice {
    let message = match err {
        Error::NoTranscripts(_) => "❌ No transcript files found in the directory.".to_string(),
        Error::Priming(_) => format!("⚠️ {}", err),
        _ => format!("⚠️ Error processing transcript files: {}", err),
    };
    Notice::new(NoticeLevel::Error, NoticeArea::Sidebar, message)
}

// ============================================================================
// Page handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Render the chat page for the caller's session
///
/// Visitors without a session get the empty page; nothing is registered
/// until they start a chat.
pub async fn index(State(state): State<AppState>, cookie: SessionCookie) -> Html<String> {
    let Some((_, handle)) = cookie.existing(&state).await else {
        return Html(render::page(&PageView::default()));
    };
    let mut session = handle.lock().await;

    let notice = session.take_notice();
    let directory = session.directory().map(|d| d.display().to_string());
    Html(render::page(&PageView {
        messages: session.messages(),
        notice: notice.as_ref(),
        started: session.is_started(),
        directory: directory.as_deref(),
    }))
}

/// Start chat form
#[derive(Debug, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    pub directory: String,
}

/// Load transcripts and prime a conversation
pub async fn start(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Form(form): Form<StartForm>,
) -> Response {
    let (id, handle) = state.sessions.get_or_create(cookie.0.as_deref()).await;
    let mut session = handle.lock().await;

    let directory = form.directory.trim();
    let notice = if directory.is_empty() {
        Notice::new(
            NoticeLevel::Info,
            NoticeArea::Sidebar,
            "Enter the directory path containing transcript files.",
        )
    } else {
        match start_session(&state, &mut session, directory).await {
            Ok(outcome) => Notice::new(
                NoticeLevel::Success,
                NoticeArea::Sidebar,
                format!(
                    "✅ Transcripts processed ({} files). You can now start chatting!",
                    outcome.files
                ),
            ),
            Err(e) => {
                warn!(session = %id, "Start failed: {}", e);
                start_error_notice(&e)
            }
        }
    };
    session.set_notice(notice);

    with_session_cookie(Redirect::to("/").into_response(), &cookie, &id)
}

/// Chat form
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Send a question from the chat form
pub async fn chat(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Form(form): Form<ChatForm>,
) -> Redirect {
    // Without a session the page still shows the disabled input
    let Some((id, handle)) = cookie.existing(&state).await else {
        return Redirect::to("/");
    };
    let mut session = handle.lock().await;

    let outcome = session
        .ask(state.model.as_ref(), &form.message)
        .await
        .map(|_| ());

    match outcome {
        Ok(()) => debug!(session = %id, "Chat turn completed"),
        Err(Error::EmptyMessage) => {}
        Err(e @ Error::ChatNotStarted) => {
            session.set_notice(Notice::new(NoticeLevel::Info, NoticeArea::Chat, e.to_string()));
        }
        Err(e) => {
            warn!(session = %id, "Chat turn failed: {}", e);
            session.set_notice(Notice::new(
                NoticeLevel::Error,
                NoticeArea::Chat,
                format!("⚠️ {}", e),
            ));
        }
    }

    Redirect::to("/")
}

/// Tear down the caller's session
pub async fn reset(State(state): State<AppState>, cookie: SessionCookie) -> Response {
    if let Some(id) = cookie.0.as_deref() {
        state.sessions.end(id).await;
    }
    clear_session_cookie(Redirect::to("/").into_response())
}

// ============================================================================
// JSON API
// ============================================================================

/// Start request payload
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub directory: String,
}

/// Start response payload
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub directory: String,
    pub files: usize,
    /// Reply to the priming message, when configured to be shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priming_reply: Option<String>,
}

/// Chat request payload
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat response payload
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub message_count: usize,
}

/// History response payload
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub started: bool,
    pub directory: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Start endpoint
pub async fn api_start(
    State(state): State<AppState>,
    cookie: SessionCookie,
    payload: std::result::Result<Json<StartRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return WebError::from(rejection).into_response(),
    };
    let directory = req.directory.trim();
    if directory.is_empty() {
        return WebError::InvalidRequest("directory must not be empty".to_string()).into_response();
    }

    let (id, handle) = state.sessions.get_or_create(cookie.0.as_deref()).await;
    let mut session = handle.lock().await;

    let result: Result<Json<StartResponse>> = start_session(&state, &mut session, directory)
        .await
        .map(|outcome| {
            Json(StartResponse {
                session_id: id.clone(),
                directory: outcome.directory.display().to_string(),
                files: outcome.files,
                priming_reply: state
                    .priming
                    .show_priming_reply
                    .then_some(outcome.priming_reply),
            })
        })
        .map_err(WebError::from);

    with_session_cookie(result.into_response(), &cookie, &id)
}

/// Chat endpoint
pub async fn api_chat(
    State(state): State<AppState>,
    cookie: SessionCookie,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(req) = payload?;
    let (_, handle) = cookie
        .existing(&state)
        .await
        .ok_or(WebError::Core(Error::ChatNotStarted))?;
    let mut session = handle.lock().await;

    let outcome = session
        .ask(state.model.as_ref(), &req.message)
        .await
        .map(|reply| reply.text.clone());

    Ok(Json(ChatResponse {
        reply: outcome?,
        message_count: session.message_count(),
    }))
}

/// History endpoint
pub async fn api_history(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Json<HistoryResponse> {
    let Some((id, handle)) = cookie.existing(&state).await else {
        return Json(HistoryResponse {
            session_id: None,
            started: false,
            directory: None,
            messages: Vec::new(),
        });
    };
    let session = handle.lock().await;

    Json(HistoryResponse {
        session_id: Some(id),
        started: session.is_started(),
        directory: session.directory().map(|d| d.display().to_string()),
        messages: session.messages().to_vec(),
    })
}

/// End session endpoint
pub async fn api_end_session(State(state): State<AppState>, cookie: SessionCookie) -> Response {
    let status = match cookie.0.as_deref() {
        Some(id) if state.sessions.end(id).await => StatusCode::NO_CONTENT,
        _ => StatusCode::NOT_FOUND,
    };
    clear_session_cookie(status.into_response())
}
