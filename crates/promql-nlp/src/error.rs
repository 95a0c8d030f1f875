//! NLP-specific error types

use thiserror::Error;

/// NLP-specific error types
#[derive(Error, Debug)]
pub enum NlpError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NlpError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for NLP operations
pub type Result<T> = std::result::Result<T, NlpError>;

// Empty or oversized questions are the caller's fault.
impl From<NlpError> for promql_core::AppError {
    fn from(err: NlpError) -> Self {
        match err {
            NlpError::Validation(msg) => promql_core::AppError::input(msg),
            NlpError::Internal(msg) => promql_core::AppError::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_input_error() {
        let err: promql_core::AppError = NlpError::validation("Query cannot be empty").into();
        assert!(matches!(err, promql_core::AppError::Input(_)));
        assert!(err.is_client_error());
    }
}
