//! # PromQL NLP
//!
//! Rule-based language processing for the PromQL translator.
//!
//! - **Normalization**: lowercasing, phrase substitution, duration folding
//! - **Intent Classification**: ordered regex tables for operation and time frame
//! - **Entity Extraction**: metric, label and duration tokens with byte spans
//!
//! ## Example
//!
//! ```rust,no_run
//! use promql_nlp::{NlpEngine, NlpEngineImpl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = NlpEngineImpl::new();
//!
//!     let normalized = engine.normalize("Rate of http_requests_total over 5 minutes").await?;
//!     let intent = engine.classify_intent(&normalized).await?;
//!     println!("Intent: {:?} {:?}", intent.intent_type, intent.operation);
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod entity;
pub mod error;
pub mod intent;
pub mod normalizer;

use async_trait::async_trait;

pub use engine::{NlpEngineImpl, DEFAULT_MAX_QUERY_LENGTH};
pub use entity::{Entity, EntityExtractor, EntityType};
pub use error::{NlpError, Result};
pub use intent::{Intent, IntentParser, IntentType, Operation, TimeFrame, GROUP_BY_MODIFIER};
pub use normalizer::Normalizer;

/// Core NLP capabilities used by context extraction.
///
/// `classify_intent` and `extract_entities` expect text that has already been
/// through [`NlpEngine::normalize`]. Both are pure and may run concurrently.
#[async_trait]
pub trait NlpEngine: Send + Sync {
    /// Validates and canonicalizes a raw question.
    async fn normalize(&self, query: &str) -> Result<String>;

    /// Classifies the operation and time frame of a normalized question.
    async fn classify_intent(&self, normalized: &str) -> Result<Intent>;

    /// Extracts metric, label and time entities from a normalized question.
    async fn extract_entities(&self, normalized: &str) -> Result<Vec<Entity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_engine_as_trait_object() {
        let engine: Box<dyn NlpEngine> = Box::new(NlpEngineImpl::new());
        let normalized = engine.normalize("errors by job").await.unwrap();
        let intent = engine.classify_intent(&normalized).await.unwrap();
        assert_eq!(intent.group_by(), Some("job"));
    }

    #[test]
    fn test_engine_from_blocking_context() {
        let engine = NlpEngineImpl::new();
        let normalized = tokio_test::block_on(engine.normalize("Past Day errors")).unwrap();
        assert_eq!(normalized, "24h errors");
    }
}
