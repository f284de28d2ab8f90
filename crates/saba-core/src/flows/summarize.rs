//! Conversation-to-memory summarization.
//!
//! Runs when a conversation is switched away from. Extracts at most one
//! durable, explicitly-user-stated fact; `None` is the normal "nothing worth
//! remembering" outcome and is distinct from failure.

use serde::Deserialize;

use crate::error::Result;
use crate::flows::render_transcript;
use crate::model::Message;
use crate::oracle::{generate_structured, Oracle};

/// Raw JSON response from the oracle for memory summarization.
#[derive(Deserialize, Debug)]
struct SummaryLlmResponse {
    summary: Option<String>,
}

const MEMORY_SYSTEM_PROMPT: &str = r#"You are a memory assistant. Your job is to analyze a conversation and extract a single, key piece of information about the user that is worth remembering.
This could be a preference, a personal detail, or an important fact.

Rules:
- The memory must be a concise, single sentence
- If no new, meaningful information about the user is revealed, the summary is null
- Focus on information explicitly stated by the user
- Do not remember tasks, reminders, or alarms
- Do not remember generic questions or pleasantries

Return ONLY valid JSON (no markdown fences, no extra text):
{"summary":"User's birthday is October 26th."} or {"summary":null}"#;

/// Summarize a conversation into at most one durable memory sentence.
///
/// Conversations at or below `min_messages` return `Ok(None)` without an
/// oracle call — a cost/noise guard, not a correctness requirement.
pub async fn summarize_conversation(
    oracle: &impl Oracle,
    messages: &[Message],
    min_messages: usize,
) -> Result<Option<String>> {
    if messages.len() <= min_messages {
        return Ok(None);
    }

    let prompt = format!(
        "Conversation History:\n{}\nBased on this conversation, what is the most important thing to remember about the user?",
        render_transcript(messages),
    );

    let response: SummaryLlmResponse =
        generate_structured(oracle, &prompt, Some(MEMORY_SYSTEM_PROMPT)).await?;

    Ok(response
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
