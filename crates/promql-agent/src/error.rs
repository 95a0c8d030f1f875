//! Agent error types

use promql_adapters::AdapterError;
use promql_core::{AppError, Cancelled};
use promql_nlp::NlpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Nlp(#[from] NlpError),

    /// Fallback completion failed in transport or at the provider
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Fallback completion could not be decoded
    #[error("Invalid response format: {message}")]
    Format { message: String, raw: String },

    #[error("Build error: {0}")]
    Build(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn format(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
            raw: raw.into(),
        }
    }

    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Maps a completion failure, keeping cancellation distinct.
    pub fn from_completion(err: AdapterError) -> Self {
        match err {
            AdapterError::Cancelled => Self::Cancelled,
            other => Self::Extraction(other.to_string()),
        }
    }

    /// Maps a schema or backend failure, keeping cancellation distinct.
    pub fn from_upstream(err: AdapterError) -> Self {
        match err {
            AdapterError::Cancelled => Self::Cancelled,
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<Cancelled> for AgentError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Nlp(err) => err.into(),
            AgentError::Extraction(msg) => AppError::extraction(msg),
            AgentError::Format { message, raw } => AppError::format(message, raw),
            AgentError::Build(msg) => AppError::build(msg),
            AgentError::Validation(msg) => AppError::validation(msg),
            AgentError::Upstream(msg) => AppError::upstream(msg),
            AgentError::Cancelled => AppError::from(Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_errors_become_extraction() {
        let err = AgentError::from_completion(AdapterError::Timeout("30s".to_string()));
        assert!(matches!(err, AgentError::Extraction(_)));
        assert!(matches!(
            AgentError::from_completion(AdapterError::Cancelled),
            AgentError::Cancelled
        ));
    }

    #[test]
    fn test_format_error_keeps_raw_in_app_error() {
        let app: AppError = AgentError::format("expected `:`", "{metric}").into();
        assert_eq!(app.raw_snippet(), Some("{metric}"));
        assert!(!app.is_client_error());
    }

    #[test]
    fn test_nlp_validation_is_client_error() {
        let app: AppError = AgentError::from(NlpError::validation("Query cannot be empty")).into();
        assert!(matches!(app, AppError::Input(_)));
    }
}
