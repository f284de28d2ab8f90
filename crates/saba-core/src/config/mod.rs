use crate::error::{Result, SabaError};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SabaConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Connection settings for the generative text oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_provider")]
    pub provider: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Hard deadline per oracle call. A hung call fails the turn instead of
    /// hanging it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_oracle_provider(),
            model: default_oracle_model(),
            api_key: None,
            base_url: None,
            env_var: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Custom data directory. Defaults to `~/.local/share/saba`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Summarize conversations into memories on conversation switch.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Conversations at or below this many messages are never summarized.
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_messages: default_min_messages(),
        }
    }
}

/// Valid oracle provider names.
pub const VALID_ORACLE_PROVIDERS: &[&str] = &["ollama", "openai", "gemini", "anthropic"];

/// Valid storage backend names.
pub const VALID_STORAGE_BACKENDS: &[&str] = &["file", "memory"];

// -- Defaults --

fn default_oracle_provider() -> String {
    "ollama".to_string()
}
fn default_oracle_model() -> String {
    "llama3.2".to_string()
}
fn default_max_tokens() -> usize {
    1024
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_storage_backend() -> String {
    "file".to_string()
}
fn default_min_messages() -> usize {
    2
}
fn default_true() -> bool {
    true
}

impl SabaConfig {
    /// Load configuration with a two-layer TOML merge:
    /// 1. ~/.config/saba/config.toml (global)
    /// 2. .saba/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".saba").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| SabaError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| SabaError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Validate config values, fixing what can be fixed and logging warnings.
    /// Lenient on purpose — a bad value should degrade, not abort.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !VALID_ORACLE_PROVIDERS.contains(&self.oracle.provider.as_str()) {
            warnings.push(format!(
                "unknown oracle provider '{}', valid: {}",
                self.oracle.provider,
                VALID_ORACLE_PROVIDERS.join(", ")
            ));
        }

        if !VALID_STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            warnings.push(format!(
                "unknown storage backend '{}', valid: {}",
                self.storage.backend,
                VALID_STORAGE_BACKENDS.join(", ")
            ));
        }

        if self.oracle.max_tokens == 0 {
            warnings.push("oracle.max_tokens = 0, setting to 256".to_string());
            self.oracle.max_tokens = 256;
        }

        if self.oracle.timeout_secs == 0 {
            warnings.push("oracle.timeout_secs = 0, setting to 60".to_string());
            self.oracle.timeout_secs = 60;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Resolved data directory for the file storage backend.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => default_data_dir(),
        }
    }
}

/// Global config path: `~/.config/saba/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("saba").join("config.toml"))
}

/// Default data directory: `~/.local/share/saba`
fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join("saba"))
        .ok_or_else(|| SabaError::Config("cannot determine data directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SabaConfig::default();
        assert_eq!(config.oracle.provider, "ollama");
        assert_eq!(config.oracle.model, "llama3.2");
        assert_eq!(config.oracle.max_tokens, 1024);
        assert_eq!(config.oracle.timeout_secs, 60);
        assert_eq!(config.storage.backend, "file");
        assert!(config.memory.enabled);
        assert_eq!(config.memory.min_messages, 2);
    }

    #[test]
    fn test_validate_clean_config_no_warnings() {
        let mut config = SabaConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_unknown_provider_warns() {
        let mut config = SabaConfig::default();
        config.oracle.provider = "banana".to_string();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("banana")));
    }

    #[test]
    fn test_validate_fixes_zero_values() {
        let mut config = SabaConfig::default();
        config.oracle.max_tokens = 0;
        config.oracle.timeout_secs = 0;
        config.validate();
        assert_eq!(config.oracle.max_tokens, 256);
        assert_eq!(config.oracle.timeout_secs, 60);
    }

    #[test]
    fn test_load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let saba_dir = dir.path().join(".saba");
        std::fs::create_dir_all(&saba_dir).unwrap();
        std::fs::write(
            saba_dir.join("config.toml"),
            "[oracle]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();

        let config = SabaConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.oracle.provider, "openai");
        assert_eq!(config.oracle.model, "gpt-4o-mini");
        // untouched sections keep their defaults
        assert_eq!(config.storage.backend, "file");
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = SabaConfig::default();
        config.storage.path = Some("/tmp/saba-test".to_string());
        assert_eq!(
            config.data_dir().unwrap(),
            PathBuf::from("/tmp/saba-test")
        );
    }
}
