use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::OracleConfig;
use crate::error::{Result, SabaError};

/// The seam between the flows and the external generative text service.
/// Production uses [`OracleClient`]; tests substitute a scripted oracle.
pub trait Oracle {
    fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// HTTP client for the generative text oracle. Reuses one provider contract
/// per backend (Ollama, OpenAI, Gemini, Anthropic).
pub struct OracleClient {
    provider: OracleProvider,
    config: OracleConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("provider", &self.provider)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Debug)]
enum OracleProvider {
    Ollama,
    OpenAI,
    Gemini,
    Anthropic,
}

impl OracleClient {
    /// Create an oracle client from configuration. The per-call timeout from
    /// `oracle.timeout_secs` is baked into the HTTP client.
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let provider = match config.provider.as_str() {
            "ollama" => OracleProvider::Ollama,
            "openai" => OracleProvider::OpenAI,
            "gemini" => OracleProvider::Gemini,
            "anthropic" | "claude" => OracleProvider::Anthropic,
            other => {
                return Err(SabaError::Config(format!(
                    "unknown oracle provider: '{other}' (expected 'ollama', 'openai', 'gemini', or 'anthropic')"
                )));
            }
        };

        // Validate API key for providers that need one
        match &provider {
            OracleProvider::OpenAI => {
                resolve_api_key(config, "OPENAI_API_KEY")?;
            }
            OracleProvider::Gemini => {
                resolve_api_key(config, "GEMINI_API_KEY")?;
            }
            OracleProvider::Anthropic => {
                resolve_api_key(config, "ANTHROPIC_API_KEY")?;
            }
            OracleProvider::Ollama => {}
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            provider,
            config: config.clone(),
            client,
        })
    }

    /// Ollama: POST {base_url}/api/generate
    async fn generate_ollama(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434");

        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": self.config.max_tokens,
            }
        });

        if let Some(sys) = system {
            body["system"] = serde_json::Value::String(sys.to_string());
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SabaError::Oracle(format!("Ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SabaError::Oracle(format!("Ollama error {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SabaError::Oracle(format!("Ollama response parse error: {e}")))?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SabaError::Oracle("Ollama response missing 'response' field".into()))
    }

    /// OpenAI: POST {base_url}/v1/chat/completions
    async fn generate_openai(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let api_key = resolve_api_key(&self.config, "OPENAI_API_KEY")?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");

        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(serde_json::json!({"role": "system", "content": sys}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SabaError::Oracle(format!("OpenAI request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SabaError::Oracle(format!("OpenAI error {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SabaError::Oracle(format!("OpenAI response parse error: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SabaError::Oracle("OpenAI response missing content".into()))
    }

    /// Anthropic: POST {base_url}/v1/messages
    async fn generate_anthropic(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let api_key = resolve_api_key(&self.config, "ANTHROPIC_API_KEY")?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com");

        let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        if let Some(sys) = system {
            body["system"] = serde_json::Value::String(sys.to_string());
        }

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SabaError::Oracle(format!("Anthropic request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SabaError::Oracle(format!(
                "Anthropic error {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SabaError::Oracle(format!("Anthropic response parse error: {e}")))?;

        // Anthropic response: {"content": [{"type": "text", "text": "..."}]}
        json["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SabaError::Oracle("Anthropic response missing text content".into()))
    }

    /// Gemini: POST generativelanguage.googleapis.com/v1beta/models/{model}:generateContent
    async fn generate_gemini(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let api_key = resolve_api_key(&self.config, "GEMINI_API_KEY")?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com");

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            base_url.trim_end_matches('/'),
            self.config.model,
            api_key,
        );

        let mut body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": self.config.max_tokens,
            }
        });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({"parts": [{"text": sys}]});
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SabaError::Oracle(format!("Gemini request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SabaError::Oracle(format!("Gemini error {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SabaError::Oracle(format!("Gemini response parse error: {e}")))?;

        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SabaError::Oracle("Gemini response missing text".into()))
    }
}

impl Oracle for OracleClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        match &self.provider {
            OracleProvider::Ollama => self.generate_ollama(prompt, system).await,
            OracleProvider::OpenAI => self.generate_openai(prompt, system).await,
            OracleProvider::Gemini => self.generate_gemini(prompt, system).await,
            OracleProvider::Anthropic => self.generate_anthropic(prompt, system).await,
        }
    }
}

/// Generate and deserialize a schema-conforming response. Fails closed: any
/// shape mismatch is an error, never a coercion. Callers may assume a
/// returned value is fully well-typed.
pub async fn generate_structured<T: DeserializeOwned>(
    oracle: &impl Oracle,
    prompt: &str,
    system: Option<&str>,
) -> Result<T> {
    let raw = oracle.generate(prompt, system).await?;
    parse_structured(&raw)
}

/// Deserialize oracle output that may be wrapped in markdown fences.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(cleaned)
        .map_err(|e| SabaError::Oracle(format!("malformed oracle output: {e}")))
}

/// Resolve an API key from config, a custom env var, or a default env var.
fn resolve_api_key(config: &OracleConfig, default_env_var: &str) -> Result<String> {
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }

    let env_var_name = config.env_var.as_deref().unwrap_or(default_env_var);

    std::env::var(env_var_name).map_err(|_| {
        SabaError::Config(format!(
            "{} oracle provider requires an API key (set oracle.api_key or {})",
            config.provider, env_var_name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Shape {
        intent: String,
        confidence: f64,
    }

    #[test]
    fn test_from_config_ollama() {
        let config = OracleConfig {
            provider: "ollama".into(),
            model: "llama3.2".into(),
            ..Default::default()
        };
        assert!(OracleClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = OracleConfig {
            provider: "banana".into(),
            ..Default::default()
        };
        let result = OracleClient::from_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown oracle provider"));
    }

    #[test]
    fn test_from_config_openai_with_key() {
        let config = OracleConfig {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert!(OracleClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_anthropic_with_key() {
        let config = OracleConfig {
            provider: "anthropic".into(),
            model: "claude-sonnet-4-5-20250929".into(),
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        };
        assert!(OracleClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_claude_alias() {
        let config = OracleConfig {
            provider: "claude".into(),
            model: "claude-sonnet-4-5-20250929".into(),
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        };
        assert!(OracleClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let config = OracleConfig {
            provider: "openai".into(),
            api_key: Some("config-key".into()),
            ..Default::default()
        };
        let key = resolve_api_key(&config, "OPENAI_API_KEY").unwrap();
        assert_eq!(key, "config-key");
    }

    #[test]
    fn test_resolve_api_key_custom_env_var() {
        std::env::set_var("MY_ORACLE_KEY", "env-oracle-key");
        let config = OracleConfig {
            provider: "openai".into(),
            api_key: None,
            env_var: Some("MY_ORACLE_KEY".into()),
            ..Default::default()
        };
        let key = resolve_api_key(&config, "OPENAI_API_KEY").unwrap();
        assert_eq!(key, "env-oracle-key");
        std::env::remove_var("MY_ORACLE_KEY");
    }

    #[test]
    fn test_parse_structured_valid() {
        let shape: Shape =
            parse_structured(r#"{"intent":"greeting","confidence":0.92}"#).unwrap();
        assert_eq!(shape.intent, "greeting");
        assert!((shape.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_structured_with_fences() {
        let raw = "```json\n{\"intent\":\"question\",\"confidence\":0.7}\n```";
        let shape: Shape = parse_structured(raw).unwrap();
        assert_eq!(shape.intent, "question");
    }

    #[test]
    fn test_parse_structured_rejects_malformed() {
        let result: Result<Shape> = parse_structured("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_structured_rejects_wrong_shape() {
        // missing required field fails closed, no coercion
        let result: Result<Shape> = parse_structured(r#"{"intent":"greeting"}"#);
        assert!(result.is_err());
    }
}
