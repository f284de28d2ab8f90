//! Response composition — the authoritative per-turn flow.
//!
//! Takes the raw user input and returns the assistant reply together with
//! the composer's own intent/entity reasoning and, when the utterance asks
//! for one, a derived task. Supersedes the separate classifier and extractor
//! calls for the turn pipeline.

use serde::Deserialize;

use crate::error::{Result, SabaError};
use crate::model::{TaskDraft, TaskKind};
use crate::oracle::{generate_structured, Oracle};

/// A fully validated composer result. `task` is advisory: it is present only
/// when the composer judged the utterance task-like, and its kind has already
/// been checked against the closed enum.
#[derive(Debug, Clone)]
pub struct ComposedReply {
    pub response: String,
    pub intent: String,
    pub entities: Vec<String>,
    pub task: Option<TaskDraft>,
}

/// Raw JSON response from the oracle for composition.
#[derive(Deserialize, Debug)]
struct ComposeLlmResponse {
    response: String,
    #[serde(default = "default_intent")]
    intent: String,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    task: Option<ComposeLlmTask>,
}

#[derive(Deserialize, Debug)]
struct ComposeLlmTask {
    #[serde(rename = "type")]
    kind: String,
    content: String,
    #[serde(default)]
    time: Option<String>,
}

fn default_intent() -> String {
    "general".to_string()
}

const COMPOSE_SYSTEM_PROMPT: &str = r#"You are SABA, a friendly and capable personal assistant. Respond to the user's message, classify its intent, and extract its key entities.

Rules:
- "response" is your reply to the user: helpful, warm, and concise
- "intent" is a short lowercase label for the message, e.g. "greeting", "question", "set_reminder"
- "entities" are the salient terms from the message, in order of appearance
- If, and only if, the user asks for a task, reminder, or alarm, include a "task" object; otherwise set "task" to null
- A task's "type" must be exactly one of "Task", "Alarm", or "Reminder"
- A task's "time" is an ISO 8601 timestamp when the user gave one, otherwise null

Return ONLY valid JSON (no markdown fences, no extra text):
{"response":"Sure, I'll remind you.","intent":"set_reminder","entities":["mom","5pm"],"task":{"type":"Reminder","content":"Call mom","time":"2024-08-15T17:00:00Z"}}"#;

/// Ask the oracle to compose a reply to the user's input.
pub async fn compose_response(oracle: &impl Oracle, user_input: &str) -> Result<ComposedReply> {
    if user_input.trim().is_empty() {
        return Err(SabaError::InvalidInput("user input cannot be empty".into()));
    }

    let prompt = format!("User message: {user_input}");

    let response: ComposeLlmResponse =
        generate_structured(oracle, &prompt, Some(COMPOSE_SYSTEM_PROMPT)).await?;

    validate_reply(response)
}

/// Enforce the composer contract on a raw oracle response: the reply must be
/// non-empty, and a surfaced task must carry a known kind.
fn validate_reply(raw: ComposeLlmResponse) -> Result<ComposedReply> {
    let response = raw.response.trim().to_string();
    if response.is_empty() {
        return Err(SabaError::EmptyResponse);
    }

    let task = raw.task.and_then(|t| match t.kind.parse::<TaskKind>() {
        Ok(kind) => Some(TaskDraft {
            kind,
            content: t.content,
            time: t.time.as_deref().and_then(parse_task_time),
        }),
        Err(_) => {
            tracing::warn!("composer returned unknown task kind '{}', dropping task", t.kind);
            None
        }
    });

    Ok(ComposedReply {
        response,
        intent: raw.intent,
        entities: raw.entities,
        task,
    })
}

/// Parse an oracle-supplied timestamp. Accepts RFC 3339 and the bare
/// `YYYY-MM-DDTHH:MM:SS` form the reference build stored. Unparseable times
/// degrade to `None` rather than dropping the task.
fn parse_task_time(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    tracing::warn!("composer returned unparseable task time '{raw}', dropping time");
    None
}
