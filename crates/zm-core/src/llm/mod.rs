//! LLM API client and types
//!
//! The hosted model sits behind [`ChatModel`]; [`GeminiClient`] is the
//! production implementation.

mod client;
mod model;
mod types;

pub use client::GeminiClient;
pub use model::{ChatModel, Conversation, PrimedConversation, Primer};
pub use types::*;
