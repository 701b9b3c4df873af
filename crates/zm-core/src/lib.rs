//! zm-core: Zoominary core library
//!
//! Transcript loading, the Gemini chat client, per-user chat sessions
//! and configuration.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod transcript;

pub use config::{Config, LlmConfig, PrimerConfig, WebConfig};
pub use error::{Error, RemoteError, Result};
pub use llm::{ChatMessage, ChatModel, Conversation, GeminiClient, Primer, Role};
pub use session::{ChatSession, Notice, NoticeArea, NoticeLevel, PrimingOptions, SessionManager};
pub use transcript::{TranscriptCorpus, load_transcripts};
