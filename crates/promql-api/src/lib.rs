//! # PromQL API
//!
//! HTTP surface of the translator:
//!
//! - `POST /api/v1/convert` translates a question into PromQL
//! - `POST /api/v1/validate` checks a query against the backend
//! - `POST /api/v1/execute` runs a query and suggests a chart
//! - `GET /api/v1/metrics` lists discovered metric names
//! - `GET /health` probes the backend

pub mod error;
pub mod rest;

use promql_adapters::{MetricSchemaCache, MetricsBackend, Validator};
use promql_agent::Translator;
use std::sync::Arc;
use std::time::Duration;

pub use error::ApiError;
pub use rest::router::create_router;

/// Shared state handed to every handler.
pub struct AppState {
    pub translator: Arc<Translator>,
    pub validator: Arc<Validator>,
    pub backend: Arc<dyn MetricsBackend>,
    pub schema: Arc<MetricSchemaCache>,
    /// Deadline applied to each request's cancellation token
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        translator: Arc<Translator>,
        validator: Arc<Validator>,
        backend: Arc<dyn MetricsBackend>,
        schema: Arc<MetricSchemaCache>,
    ) -> Self {
        Self {
            translator,
            validator,
            backend,
            schema,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
