use chrono::Utc;
use serde::Serialize;

use crate::models::chat::{ ChatMessage, ChatRole, ChatTurn };

/// Append-only, chronologically ordered log of user and assistant turns.
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<ChatTurn>,
}

/// A transcript entry that keeps who said it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry<'a> {
    pub role: ChatRole,
    pub text: &'a str,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, role: ChatRole, content: &str) {
        self.turns.push(ChatTurn {
            role,
            content: content.to_string(),
            timestamp: Utc::now().timestamp(),
        });
    }

    pub fn add_user_message(&mut self, content: &str) {
        self.add_message(ChatRole::User, content);
    }

    pub fn add_assistant_message(&mut self, content: &str) {
        self.add_message(ChatRole::Assistant, content);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Prior turns replayed as model messages. Anything not from the user is
    /// replayed as the assistant.
    pub fn as_prompt_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| {
                match turn.role {
                    ChatRole::User => ChatMessage::user(turn.content.clone()),
                    _ => ChatMessage::assistant(turn.content.clone()),
                }
            })
            .collect()
    }

    /// Every turn's raw text, one per line, role labels dropped.
    pub fn flattened_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn labeled_transcript(&self) -> Vec<TranscriptEntry<'_>> {
        self.turns
            .iter()
            .map(|turn| TranscriptEntry { role: turn.role, text: &turn.content })
            .collect()
    }
}
