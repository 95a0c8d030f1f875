//! # PromQL Adapters
//!
//! Clients for the services the translator talks to: the Prometheus HTTP
//! API, an OpenAI-compatible chat-completion endpoint, and an optional
//! Neo4j graph of related metrics. Also hosts the metric schema cache and the
//! live query validator built on top of the Prometheus client.

pub mod graph;
pub mod llm;
pub mod prometheus;
pub mod retry;
pub mod schema;
pub mod validator;

pub use graph::{connect_graph, MetricGraph, Neo4jClient, RelatedMetric};
pub use llm::{ChatCompletionClient, CompletionProvider};
pub use prometheus::{
    MetricsBackend, PrometheusClient, QueryData, QueryResult, RangeQuery, ResultType, Sample,
    Series,
};
pub use retry::RetryPolicy;
pub use schema::{MetricSchema, MetricSchemaCache, MetricType, SchemaSnapshot, DISCOVERY_QUERY};
pub use validator::{ValidationResult, Validator};

use promql_core::{AppError, Cancelled};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<Cancelled> for AdapterError {
    fn from(_: Cancelled) -> Self {
        AdapterError::Cancelled
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(err.to_string())
        } else if err.is_connect() {
            AdapterError::ConnectionError(err.to_string())
        } else if err.is_decode() {
            AdapterError::SerializationError(err.to_string())
        } else {
            AdapterError::RequestFailed(err.to_string())
        }
    }
}

impl From<AdapterError> for AppError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Cancelled => AppError::from(Cancelled),
            AdapterError::Configuration(msg) => AppError::Config(msg),
            other => AppError::upstream(other.to_string()),
        }
    }
}
