use thiserror::Error;

#[derive(Debug, Error)]
pub enum SabaError {
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SabaError {
    /// Returns `true` for failures at the oracle boundary. The orchestrator
    /// recovers these into an apology turn instead of propagating them.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            Self::Oracle(_) | Self::EmptyResponse | Self::Http(_) | Self::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SabaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_failure_classification() {
        assert!(SabaError::Oracle("timed out".into()).is_oracle_failure());
        assert!(SabaError::EmptyResponse.is_oracle_failure());
    }

    #[test]
    fn test_non_oracle_failures() {
        assert!(!SabaError::Persistence("disk full".into()).is_oracle_failure());
        assert!(!SabaError::Config("missing API key".into()).is_oracle_failure());
        assert!(!SabaError::NotFound("conversation xyz".into()).is_oracle_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = SabaError::EmptyResponse;
        assert_eq!(err.to_string(), "Oracle returned an empty response");

        let err = SabaError::Oracle("API error 503".into());
        assert!(err.to_string().contains("503"));
    }
}
