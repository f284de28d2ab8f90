//! Intent detection for a single user message.

use serde::Deserialize;

use crate::error::{Result, SabaError};
use crate::oracle::{generate_structured, Oracle};

/// The detected intent of a message with the oracle's confidence.
/// Thresholding, if any, is the caller's concern.
#[derive(Debug, Clone)]
pub struct IntentDetection {
    pub intent: String,
    pub confidence: f32,
}

/// Raw JSON response from the oracle for intent detection.
#[derive(Deserialize, Debug)]
struct IntentLlmResponse {
    intent: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

const INTENT_SYSTEM_PROMPT: &str = r#"You are an intent classifier for a personal assistant. Determine the intent of the user's message and your confidence in that determination.

Rules:
- The intent is a short lowercase label, e.g. "greeting", "question", "set_reminder", "small_talk"
- Confidence is a number between 0 and 1

Return ONLY valid JSON (no markdown fences, no extra text):
{"intent":"question","confidence":0.9}"#;

/// Ask the oracle to classify the intent of a message.
pub async fn classify_intent(oracle: &impl Oracle, message: &str) -> Result<IntentDetection> {
    if message.trim().is_empty() {
        return Err(SabaError::InvalidInput("message cannot be empty".into()));
    }

    let prompt = format!("Determine the intent of the following message:\n\nMessage: {message}");

    let response: IntentLlmResponse =
        generate_structured(oracle, &prompt, Some(INTENT_SYSTEM_PROMPT)).await?;

    Ok(IntentDetection {
        intent: response.intent,
        confidence: (response.confidence as f32).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::parse_structured;

    fn parse_response(raw: &str) -> Result<IntentDetection> {
        let response: IntentLlmResponse = parse_structured(raw)?;
        Ok(IntentDetection {
            intent: response.intent,
            confidence: (response.confidence as f32).clamp(0.0, 1.0),
        })
    }

    #[test]
    fn test_parse_intent_valid() {
        let result = parse_response(r#"{"intent":"greeting","confidence":0.95}"#).unwrap();
        assert_eq!(result.intent, "greeting");
        assert!((result.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_intent_with_fences() {
        let raw = "```json\n{\"intent\":\"set_reminder\",\"confidence\":0.8}\n```";
        let result = parse_response(raw).unwrap();
        assert_eq!(result.intent, "set_reminder");
    }

    #[test]
    fn test_parse_intent_clamps_confidence() {
        let result = parse_response(r#"{"intent":"question","confidence":1.7}"#).unwrap();
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);

        let result = parse_response(r#"{"intent":"question","confidence":-0.3}"#).unwrap();
        assert!(result.confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_intent_missing_confidence_defaults() {
        let result = parse_response(r#"{"intent":"question"}"#).unwrap();
        assert!((result.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_intent_missing_intent_rejected() {
        assert!(parse_response(r#"{"confidence":0.5}"#).is_err());
    }
}
