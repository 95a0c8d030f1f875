//! Application-wide error taxonomy.
//!
//! Crate-local errors (`NlpError`, `AdapterError`, `AgentError`) convert into
//! [`AppError`], which the HTTP layer maps onto status codes.

use thiserror::Error;

use crate::cancel::Cancelled;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or empty request
    #[error("invalid input: {0}")]
    Input(String),

    /// Fallback model or network failure while extracting query context
    #[error("context extraction failed: {0}")]
    Extraction(String),

    /// Fallback response could not be decoded into the expected JSON shape
    #[error("invalid response format: {message}")]
    Format { message: String, raw: String },

    /// No metric could be resolved for assembly
    #[error("failed to build query: {0}")]
    Build(String),

    /// The backend rejected the assembled query
    #[error("invalid PromQL query: {0}")]
    Validation(String),

    /// Schema refresh or other collaborator failure
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The caller's deadline elapsed or the request was abandoned
    #[error("request cancelled: {0}")]
    Cancelled(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

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

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures the client caused and can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::Build(_) | Self::Validation(_)
        )
    }

    /// Raw model output attached to a format failure, if any.
    pub fn raw_snippet(&self) -> Option<&str> {
        match self {
            Self::Format { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<Cancelled> for AppError {
    fn from(err: Cancelled) -> Self {
        Self::Cancelled(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::input("empty query").is_client_error());
        assert!(AppError::build("no metric specified").is_client_error());
        assert!(AppError::validation("bad").is_client_error());
        assert!(!AppError::extraction("timeout").is_client_error());
        assert!(!AppError::upstream("down").is_client_error());
        assert!(!AppError::from(Cancelled).is_client_error());
    }

    #[test]
    fn test_format_error_keeps_raw_snippet() {
        let err = AppError::format("expected value at line 1", "{not json}");
        assert_eq!(err.raw_snippet(), Some("{not json}"));
        assert!(err.to_string().contains("expected value"));
        assert_eq!(AppError::internal("x").raw_snippet(), None);
    }
}
