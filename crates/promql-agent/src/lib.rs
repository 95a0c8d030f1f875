//! # PromQL Agent
//!
//! Turns a natural-language question into a PromQL query:
//!
//! - [`ContextExtractor`] resolves a [`promql_core::QueryContext`] using the
//!   rule-based NLP engine, the metric schema cache and, when no metric
//!   resolves, one language-model completion
//! - [`QueryBuilder`] assembles the query text deterministically
//! - [`Explainer`] describes the result in a sentence
//! - [`Translator`] runs the whole sequence including backend validation
//!
//! [`KnowledgePatterns`] supplies template suggestions and
//! [`suggest_chart`] picks a chart type for executed queries.

pub mod builder;
pub mod chart;
pub mod error;
pub mod explainer;
pub mod extractor;
pub mod patterns;
pub mod pipeline;
pub mod prompts;

pub use builder::{QueryBuilder, NO_METRIC_WARNING};
pub use chart::{suggest_chart, ChartType};
pub use error::{AgentError, Result};
pub use explainer::Explainer;
pub use extractor::ContextExtractor;
pub use patterns::{KnowledgePatterns, MetricPattern, SimilarMetric};
pub use pipeline::{Conversion, Translator};
