//! Session types

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PrimerConfig;
use crate::llm::{ChatMessage, ChatModel, Conversation, Primer};
use crate::transcript::load_transcripts;
use crate::{Error, Result};

/// How new conversations are primed
#[derive(Debug, Clone, Default)]
pub struct PrimingOptions {
    /// Instruction block sent as the system instruction
    pub instruction: Option<String>,
    /// Line placed before the transcripts in the priming message
    pub transcript_header: String,
    /// Append the model's reply to the priming message to the history
    pub show_priming_reply: bool,
}

impl PrimingOptions {
    /// Resolve options from configuration, reading the instruction file if any
    pub fn from_config(config: &PrimerConfig) -> Result<Self> {
        Ok(Self {
            instruction: config.resolve_instruction()?,
            transcript_header: config.transcript_header.clone(),
            show_priming_reply: config.show_priming_reply,
        })
    }
}

/// Severity of a notice shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Where a notice is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeArea {
    Sidebar,
    Chat,
}

/// One-shot message for the next page render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub area: NoticeArea,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, area: NoticeArea, message: impl Into<String>) -> Self {
        Self {
            level,
            area,
            message: message.into(),
        }
    }
}

/// Result of a successful start
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub directory: PathBuf,
    pub files: usize,
    pub priming_reply: String,
}

/// One user's chat: the open conversation and what has been displayed
#[derive(Debug)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: String,
    conversation: Option<Conversation>,
    messages: Vec<ChatMessage>,
    directory: Option<PathBuf>,
    notice: Option<Notice>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            conversation: None,
            messages: Vec::new(),
            directory: None,
            notice: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Load transcripts from `dir` and prime a new conversation with them
    ///
    /// On success the previous conversation and its history are replaced.
    /// On failure the session is left exactly as it was.
    pub async fn start(
        &mut self,
        model: &dyn ChatModel,
        dir: &Path,
        options: &PrimingOptions,
    ) -> Result<StartOutcome> {
        let corpus = load_transcripts(dir).await?;
        let primer = Primer::new(
            options.instruction.clone(),
            &options.transcript_header,
            &corpus.text,
        );

        let primed = model
            .start_conversation(&primer)
            .await
            .map_err(Error::Priming)?;

        if let Some(previous) = self.conversation.as_ref() {
            info!(
                session = %self.id,
                conversation = %previous.id(),
                "Abandoning previous conversation"
            );
        }
        info!(
            session = %self.id,
            conversation = %primed.conversation.id(),
            model = model.name(),
            files = corpus.file_count(),
            "Conversation primed"
        );

        self.conversation = Some(primed.conversation);
        self.messages.clear();
        if options.show_priming_reply {
            self.messages.push(ChatMessage::assistant(primed.reply.clone()));
        }
        self.directory = Some(dir.to_path_buf());
        self.updated_at = Utc::now();

        Ok(StartOutcome {
            directory: dir.to_path_buf(),
            files: corpus.file_count(),
            priming_reply: primed.reply,
        })
    }

    /// Send a question on the open conversation
    ///
    /// The question and the reply are appended together; a failed turn
    /// appends nothing.
    pub async fn ask(&mut self, model: &dyn ChatModel, text: &str) -> Result<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let conversation = self.conversation.as_mut().ok_or(Error::ChatNotStarted)?;
        let reply = model
            .send(conversation, text)
            .await
            .map_err(Error::ChatTurn)?;

        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::assistant(reply));
        self.updated_at = Utc::now();

        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Whether a conversation is open
    pub fn is_started(&self) -> bool {
        self.conversation.is_some()
    }

    /// The open conversation, if any
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Displayed messages, in order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Directory the current conversation was primed from
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Replace the pending notice
    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Take the pending notice, leaving none
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Get message count
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies "reply N" and can be told to fail the next call
    #[derive(Default)]
    struct ScriptedModel {
        calls: Mutex<Vec<String>>,
        fail_next: Mutex<bool>,
    }

    impl ScriptedModel {
        fn fail_next(&self) {
            *self.fail_next.lock().unwrap() = true;
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(
            &self,
            conversation: &mut Conversation,
            text: &str,
        ) -> std::result::Result<String, RemoteError> {
            if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
                return Err(RemoteError::Status {
                    status: 500,
                    body: "unavailable".to_string(),
                });
            }
            let mut calls = self.calls.lock().unwrap();
            calls.push(text.to_string());
            let reply = format!("reply {}", calls.len());
            conversation.record_exchange(text, reply.clone());
            Ok(reply)
        }
    }

    fn transcripts(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn options() -> PrimingOptions {
        PrimingOptions {
            instruction: None,
            transcript_header: "Here are the transcripts:".to_string(),
            show_priming_reply: false,
        }
    }

    #[tokio::test]
    async fn test_start_primes_with_corpus() {
        let dir = transcripts(&[("standup.txt", "Bob: shipped it")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");

        let outcome = session.start(&model, dir.path(), &options()).await.unwrap();

        assert_eq!(outcome.files, 1);
        assert!(session.is_started());
        assert!(session.messages().is_empty());
        assert_eq!(
            model.calls(),
            vec!["Here are the transcripts:\nBob: shipped it\n\n".to_string()]
        );
    }

    #[tokio::test]
    async fn test_start_can_show_priming_reply() {
        let dir = transcripts(&[("a.txt", "Hello")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");
        let options = PrimingOptions {
            show_priming_reply: true,
            ..options()
        };

        session.start(&model, dir.path(), &options).await.unwrap();

        assert_eq!(session.messages(), &[ChatMessage::assistant("reply 1")]);
    }

    #[tokio::test]
    async fn test_start_without_transcripts_keeps_chat_disabled() {
        let dir = transcripts(&[("notes.md", "nothing")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");

        let err = session.start(&model, dir.path(), &options()).await.unwrap_err();

        assert!(matches!(err, Error::NoTranscripts(_)));
        assert!(!session.is_started());
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_priming_failure_stores_no_handle() {
        let dir = transcripts(&[("a.txt", "Hello")]);
        let model = ScriptedModel::default();
        model.fail_next();
        let mut session = ChatSession::new("s1");

        let err = session.start(&model, dir.path(), &options()).await.unwrap_err();

        assert!(matches!(err, Error::Priming(_)));
        assert!(!session.is_started());
    }

    #[tokio::test]
    async fn test_turns_alternate_in_order() {
        let dir = transcripts(&[("a.txt", "Hello")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");
        session.start(&model, dir.path(), &options()).await.unwrap();

        let questions = ["Who attended?", "What was decided?", "Any action items?"];
        for q in questions {
            session.ask(&model, q).await.unwrap();
        }

        let messages = session.messages();
        assert_eq!(messages.len(), 2 * questions.len());
        for (i, q) in questions.iter().enumerate() {
            assert_eq!(messages[2 * i], ChatMessage::user(*q));
            assert!(!messages[2 * i + 1].is_user());
        }
        // The conversation handle holds the priming exchange too
        assert_eq!(session.conversation().unwrap().turns().len(), 2 * (questions.len() + 1));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_unchanged() {
        let dir = transcripts(&[("a.txt", "Hello")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");
        session.start(&model, dir.path(), &options()).await.unwrap();
        session.ask(&model, "first").await.unwrap();

        model.fail_next();
        let err = session.ask(&model, "second").await.unwrap_err();

        assert!(matches!(err, Error::ChatTurn(_)));
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.conversation().unwrap().turns().len(), 4);
    }

    #[tokio::test]
    async fn test_ask_before_start() {
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");

        let err = session.ask(&model, "hello?").await.unwrap_err();
        assert!(matches!(err, Error::ChatNotStarted));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let dir = transcripts(&[("a.txt", "Hello")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");
        session.start(&model, dir.path(), &options()).await.unwrap();

        let err = session.ask(&model, "   ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyMessage));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_replaces_conversation() {
        let first = transcripts(&[("a.txt", "Hello")]);
        let second = transcripts(&[("b.txt", "World")]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");

        session.start(&model, first.path(), &options()).await.unwrap();
        session.ask(&model, "question").await.unwrap();
        let old_id = session.conversation().unwrap().id().to_string();

        session.start(&model, second.path(), &options()).await.unwrap();

        let conversation = session.conversation().unwrap();
        assert_ne!(conversation.id(), old_id);
        assert_eq!(conversation.turns()[0].text, "Here are the transcripts:\nWorld\n\n");
        assert!(session.messages().is_empty());
        assert_eq!(session.directory(), Some(second.path()));
    }

    #[tokio::test]
    async fn test_failed_restart_keeps_previous_conversation() {
        let first = transcripts(&[("a.txt", "Hello")]);
        let empty = transcripts(&[]);
        let model = ScriptedModel::default();
        let mut session = ChatSession::new("s1");

        session.start(&model, first.path(), &options()).await.unwrap();
        session.ask(&model, "question").await.unwrap();

        assert!(session.start(&model, empty.path(), &options()).await.is_err());
        assert!(session.is_started());
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.directory(), Some(first.path()));
    }

    #[test]
    fn test_notice_is_taken_once() {
        let mut session = ChatSession::new("s1");
        session.set_notice(Notice::new(NoticeLevel::Error, NoticeArea::Chat, "oops"));

        assert_eq!(session.take_notice().unwrap().message, "oops");
        assert!(session.take_notice().is_none());
    }

    #[test]
    fn test_priming_options_from_config() {
        let config = PrimerConfig {
            instruction: Some("Cite the speaker.".to_string()),
            show_priming_reply: true,
            ..PrimerConfig::default()
        };
        let options = PrimingOptions::from_config(&config).unwrap();
        assert_eq!(options.instruction.as_deref(), Some("Cite the speaker."));
        assert_eq!(options.transcript_header, "Here are the transcripts:");
        assert!(options.show_priming_reply);
    }
}
