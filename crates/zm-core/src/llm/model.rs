//! Conversation model abstraction

use async_trait::async_trait;

use super::types::ChatMessage;
use crate::error::RemoteError;

/// Opening of a conversation: instruction block plus the priming message
#[derive(Debug, Clone)]
pub struct Primer {
    /// System instruction, if configured
    pub instruction: Option<String>,
    /// First user turn, carrying the transcripts
    pub message: String,
}

impl Primer {
    /// Build the priming message as `"{header}\n{corpus}"`
    pub fn new(instruction: Option<String>, header: &str, corpus: &str) -> Self {
        Self {
            instruction,
            message: format!("{}\n{}", header, corpus),
        }
    }
}

/// Handle to an open conversation
///
/// Owns the turns the model has seen so far. A turn is recorded only after
/// the model answered it.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    instruction: Option<String>,
    turns: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(instruction: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instruction,
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    /// Turns exchanged so far, oldest first
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Record a completed exchange
    pub fn record_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(ChatMessage::user(user));
        self.turns.push(ChatMessage::assistant(reply));
    }
}

/// A conversation that has been primed, with the model's first reply
#[derive(Debug, Clone)]
pub struct PrimedConversation {
    pub conversation: Conversation,
    pub reply: String,
}

/// Hosted conversational model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs
    fn name(&self) -> &str;

    /// Send `text` on `conversation` and return the reply
    ///
    /// On error the conversation is left unchanged.
    async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> std::result::Result<String, RemoteError>;

    /// Open a conversation and send the priming message
    async fn start_conversation(
        &self,
        primer: &Primer,
    ) -> std::result::Result<PrimedConversation, RemoteError> {
        let mut conversation = Conversation::new(primer.instruction.clone());
        let reply = self.send(&mut conversation, &primer.message).await?;
        Ok(PrimedConversation {
            conversation,
            reply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primer_message() {
        let primer = Primer::new(None, "Here are the transcripts:", "Hello\n\nWorld\n\n");
        assert_eq!(primer.message, "Here are the transcripts:\nHello\n\nWorld\n\n");
    }

    #[test]
    fn test_conversation_records_exchanges() {
        let mut conversation = Conversation::new(Some("Be helpful".to_string()));
        assert!(conversation.turns().is_empty());
        assert_eq!(conversation.instruction(), Some("Be helpful"));

        conversation.record_exchange("Who spoke first?", "Alice.");
        assert_eq!(conversation.turns().len(), 2);
        assert!(conversation.turns()[0].is_user());
        assert_eq!(conversation.turns()[1].text, "Alice.");
    }

    #[test]
    fn test_conversation_ids_are_unique() {
        assert_ne!(Conversation::new(None).id(), Conversation::new(None).id());
    }
}
