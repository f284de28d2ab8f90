//! Oracle-backed classification and derivation flows.
//!
//! Each flow is a pure function of the oracle: typed input in, typed
//! schema-validated output out. The orchestrator composes them per turn.

pub mod compose;
pub mod entities;
pub mod intent;
pub mod summarize;

pub use compose::{compose_response, ComposedReply};
pub use entities::extract_entities;
pub use intent::{classify_intent, IntentDetection};
pub use summarize::summarize_conversation;

use crate::model::Message;

/// Serialize messages as a stable, human-readable transcript for prompts:
/// one `role: content` line per message.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!("{}: {}\n", message.role, message.content));
    }
    out
}
