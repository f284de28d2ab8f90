use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of characters taken from the first user message when
/// deriving a conversation title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn half within a conversation. Immutable once finalized, except
/// for the in-place placeholder-to-final transition matched by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_processing: bool,
}

impl Message {
    pub fn user(content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: Role::User,
            content,
            created_at: Utc::now(),
            intent: None,
            entities: Vec::new(),
            is_processing: false,
        }
    }

    /// An unresolved assistant message. Inserted before any oracle latency so
    /// the render layer can show a busy indicator.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::now_v7(),
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            intent: None,
            entities: Vec::new(),
            is_processing: true,
        }
    }

    /// Resolve a placeholder in place with the final assistant content.
    pub fn resolve(&mut self, content: String, intent: Option<String>, entities: Vec<String>) {
        self.content = content;
        self.intent = intent;
        self.entities = entities;
        self.is_processing = false;
    }
}

/// An ordered exchange of messages. The title is derived from the first user
/// message at creation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create a conversation from its triggering user message. A conversation
    /// always holds at least this one message.
    pub fn new(first_message: Message) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: derive_title(&first_message.content),
            created_at: Utc::now(),
            messages: vec![first_message],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn message_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Count of unresolved assistant placeholders.
    pub fn processing_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_processing).count()
    }
}

/// First `TITLE_MAX_CHARS` characters of the input, with an ellipsis when
/// truncated. Operates on chars, not bytes.
pub fn derive_title(input: &str) -> String {
    let title: String = input.chars().take(TITLE_MAX_CHARS).collect();
    if input.chars().count() > TITLE_MAX_CHARS {
        format!("{title}...")
    } else {
        title
    }
}
