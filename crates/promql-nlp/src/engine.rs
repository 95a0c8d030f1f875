//! NLP Engine implementation.
//!
//! Wires the normalizer, intent parser and entity extractor behind the
//! [`NlpEngine`] trait.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::entity::{Entity, EntityExtractor};
use crate::error::{NlpError, Result};
use crate::intent::{Intent, IntentParser};
use crate::normalizer::Normalizer;
use crate::NlpEngine;

/// Longest question accepted, in bytes.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1000;

/// Rule-based NLP engine.
#[derive(Debug, Clone)]
pub struct NlpEngineImpl {
    normalizer: Normalizer,
    intent_parser: IntentParser,
    entity_extractor: EntityExtractor,
    max_query_length: usize,
}

impl NlpEngineImpl {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
            intent_parser: IntentParser::new(),
            entity_extractor: EntityExtractor::new(),
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }

    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    /// Validates the query before processing.
    fn validate_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(NlpError::validation("Query cannot be empty"));
        }

        if query.len() > self.max_query_length {
            return Err(NlpError::validation(format!(
                "Query is too long (max {} characters)",
                self.max_query_length
            )));
        }

        Ok(())
    }
}

impl Default for NlpEngineImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NlpEngine for NlpEngineImpl {
    #[instrument(skip(self), fields(query_len = query.len()))]
    async fn normalize(&self, query: &str) -> Result<String> {
        self.validate_query(query)?;
        Ok(self.normalizer.normalize(query))
    }

    #[instrument(skip(self), fields(query_len = normalized.len()))]
    async fn classify_intent(&self, normalized: &str) -> Result<Intent> {
        self.validate_query(normalized)?;
        let intent = self.intent_parser.parse(normalized);
        debug!(
            "Intent classified: {:?} operation={:?}",
            intent.intent_type, intent.operation
        );
        Ok(intent)
    }

    #[instrument(skip(self), fields(query_len = normalized.len()))]
    async fn extract_entities(&self, normalized: &str) -> Result<Vec<Entity>> {
        self.validate_query(normalized)?;
        let entities = self.entity_extractor.extract(normalized);

        for entity in &entities {
            debug!(
                "Entity: {:?} = {} [{}, {})",
                entity.entity_type, entity.value, entity.start, entity.end
            );
        }

        Ok(entities)
    }
}
