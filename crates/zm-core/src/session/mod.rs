//! Session management module
//!
//! Per-user chat state: the open conversation and the displayed history.

mod manager;
mod types;

pub use manager::{SessionHandle, SessionManager};
pub use types::{ChatSession, Notice, NoticeArea, NoticeLevel, PrimingOptions, StartOutcome};
