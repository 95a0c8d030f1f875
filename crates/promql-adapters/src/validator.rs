//! Live query validation.
//!
//! A query is valid when the backend accepts it. Any backend failure,
//! including transport errors, is reported as an invalid query.

use promql_core::CancellationToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::prometheus::MetricsBackend;
use crate::{AdapterError, AdapterResult};

/// Queries longer than this get an advisory warning.
pub const RECOMMENDED_MAX_LENGTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Validator {
    backend: Arc<dyn MetricsBackend>,
}

impl Validator {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Round-trips `query` through the backend.
    ///
    /// Only cancellation is returned as `Err`; every other outcome is a
    /// [`ValidationResult`].
    #[instrument(skip(self, cancel), fields(query_len = query.len()))]
    pub async fn validate(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<ValidationResult> {
        let warnings = advisory_warnings(query);

        if query.trim().is_empty() {
            return Ok(ValidationResult {
                valid: false,
                warnings,
                error: Some("empty query".to_string()),
            });
        }

        match self.backend.query(query, None, cancel).await {
            Ok(_) => Ok(ValidationResult {
                valid: true,
                warnings,
                error: None,
            }),
            Err(AdapterError::Cancelled) => Err(AdapterError::Cancelled),
            Err(e) => {
                debug!("Backend rejected query: {}", e);
                Ok(ValidationResult {
                    valid: false,
                    warnings,
                    error: Some(format!("invalid query: {}", e)),
                })
            }
        }
    }
}

fn advisory_warnings(query: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    if query.len() > RECOMMENDED_MAX_LENGTH {
        warnings.push("query exceeds recommended length".to_string());
    }
    if query.matches('{').count() != query.matches('}').count() {
        warnings.push("unbalanced curly braces".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prometheus::{QueryData, QueryResult, RangeQuery, ResultType};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        calls: AtomicUsize,
        reject: bool,
    }

    impl MockBackend {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reject: false,
            })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reject: true,
            })
        }
    }

    #[async_trait]
    impl MetricsBackend for MockBackend {
        async fn query(
            &self,
            _promql: &str,
            _time: Option<DateTime<Utc>>,
            cancel: &CancellationToken,
        ) -> AdapterResult<QueryData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if cancel.is_cancelled() {
                return Err(AdapterError::Cancelled);
            }
            if self.reject {
                return Err(AdapterError::RequestFailed(
                    "Request failed with status 400 Bad Request: parse error".to_string(),
                ));
            }
            Ok(QueryData {
                result_type: ResultType::Vector,
                result: QueryResult::Series(Vec::new()),
            })
        }

        async fn query_range(
            &self,
            _promql: &str,
            _range: &RangeQuery,
            _cancel: &CancellationToken,
        ) -> AdapterResult<QueryData> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_empty_query_skips_backend() {
        let backend = MockBackend::accepting();
        let validator = Validator::new(backend.clone());

        let result = validator.validate("", &CancellationToken::new()).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("empty query"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_accepted_query() {
        let validator = Validator::new(MockBackend::accepting());
        let result = validator
            .validate(r#"rate(http_requests_total{code="500"}[5m])"#, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.valid);
        assert!(result.warnings.is_empty());
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_rejected_query_carries_cause() {
        let validator = Validator::new(MockBackend::rejecting());
        let result = validator
            .validate("rate(", &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.valid);
        let error = result.error.unwrap();
        assert!(error.starts_with("invalid query: "));
        assert!(error.contains("parse error"));
    }

    #[tokio::test]
    async fn test_warnings_independent_of_verdict() {
        let validator = Validator::new(MockBackend::accepting());
        let result = validator
            .validate("up{job=\"api\"", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.warnings, vec!["unbalanced curly braces"]);

        let long = format!("up{}", " ".repeat(RECOMMENDED_MAX_LENGTH));
        let result = validator.validate(&long, &CancellationToken::new()).await.unwrap();
        assert_eq!(result.warnings, vec!["query exceeds recommended length"]);
    }

    #[tokio::test]
    async fn test_cancellation_is_an_error() {
        let validator = Validator::new(MockBackend::accepting());
        let token = CancellationToken::new();
        token.cancel();
        let result = validator.validate("up", &token).await;
        assert!(matches!(result, Err(AdapterError::Cancelled)));
    }
}
