//! Entity extraction from a single user message.

use serde::Deserialize;

use crate::error::Result;
use crate::oracle::{generate_structured, Oracle};

/// Raw JSON response from the oracle for entity extraction.
#[derive(Deserialize, Debug)]
struct EntitiesLlmResponse {
    #[serde(default)]
    entities: Vec<String>,
}

const ENTITIES_SYSTEM_PROMPT: &str = r#"You are an expert at extracting entities from text. Extract the key entities (names, places, dates, times, things) from the user's message.

Rules:
- Return the entities in the order they appear
- An empty list is a valid answer

Return ONLY valid JSON (no markdown fences, no extra text):
{"entities":["mom","5pm","tomorrow"]}"#;

/// Ask the oracle to extract the salient entities of a message. Order
/// reflects oracle output order; no deduplication is applied.
pub async fn extract_entities(oracle: &impl Oracle, message: &str) -> Result<Vec<String>> {
    let prompt = format!("Extract the key entities from the following message:\n\nMessage: {message}");

    let response: EntitiesLlmResponse =
        generate_structured(oracle, &prompt, Some(ENTITIES_SYSTEM_PROMPT)).await?;

    Ok(response.entities)
}
