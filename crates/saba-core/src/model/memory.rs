use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SabaError};

pub const MAX_MEMORY_LENGTH: usize = 1_000;

/// A durable, user-scoped fact sentence retained across conversations.
/// Never auto-updated — only created (by the summarizer or directly) and
/// explicitly deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub content: String,
}

impl Memory {
    pub fn new(content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            content,
        }
    }
}

/// Validate content for a new memory entry.
pub fn validate_memory_content(content: &str) -> Result<()> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SabaError::InvalidInput("memory cannot be empty".into()));
    }
    if trimmed.len() > MAX_MEMORY_LENGTH {
        return Err(SabaError::InvalidInput(format!(
            "memory exceeds maximum length of {MAX_MEMORY_LENGTH} characters"
        )));
    }
    Ok(())
}
