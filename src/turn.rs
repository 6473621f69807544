//! Conversation turns and their persisted encoding.

use chat_provider::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// One message of a session transcript.
///
/// `augmented` marks engine-generated marker turns that record a web search;
/// it is omitted from the stored JSON when false so plain transcripts stay
/// `[{"role":..,"content":..}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub augmented: bool,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            augmented: false,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Visible note that the reply to the preceding user turn used web search.
    #[must_use]
    pub fn search_marker(query: &str) -> Self {
        Self {
            role: Role::System,
            content: format!("Searched the web for \"{query}\""),
            augmented: true,
        }
    }

    /// Model-facing form: role and content only.
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn encode_turns(turns: &[Turn]) -> Result<String, serde_json::Error> {
    serde_json::to_string(turns)
}

pub(crate) fn decode_turns(raw: &str) -> Result<Vec<Turn>, serde_json::Error> {
    serde_json::from_str(raw)
}
