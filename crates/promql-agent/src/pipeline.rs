//! End-to-end translation: extract, build, validate, explain.

use promql_adapters::Validator;
use promql_core::{AppResult, CancellationToken};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::builder::QueryBuilder;
use crate::error::AgentError;
use crate::explainer::Explainer;
use crate::extractor::ContextExtractor;

/// Outcome of a successful translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub promql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

pub struct Translator {
    extractor: ContextExtractor,
    builder: QueryBuilder,
    validator: Arc<Validator>,
    explainer: Explainer,
}

impl Translator {
    pub fn new(extractor: ContextExtractor, validator: Arc<Validator>, explainer: Explainer) -> Self {
        Self {
            extractor,
            builder: QueryBuilder::new(),
            validator,
            explainer,
        }
    }

    /// Translates a question into a validated query.
    ///
    /// An unresolvable metric is a build failure and a backend rejection is
    /// a validation failure; both carry the reason for the client.
    #[instrument(skip(self, cancel), fields(query_len = query.len()))]
    pub async fn convert(&self, query: &str, cancel: &CancellationToken) -> AppResult<Conversion> {
        let ctx = self.extractor.extract(query, cancel).await?;

        let (promql, mut warnings) = self.builder.build(&ctx);
        if promql.is_empty() {
            return Err(AgentError::build(warnings.join("; ")).into());
        }

        let validation = self
            .validator
            .validate(&promql, cancel)
            .await
            .map_err(AgentError::from_upstream)?;
        if !validation.valid {
            let reason = validation.error.unwrap_or_else(|| "invalid query".to_string());
            return Err(AgentError::validation(reason).into());
        }
        warnings.extend(validation.warnings);

        let explanation = self.explainer.explain(&ctx, &promql, cancel).await?;

        let mut suggestions: Vec<String> = Vec::new();
        for rule in &ctx.rules {
            if rule.pattern != promql && !suggestions.contains(&rule.pattern) {
                suggestions.push(rule.pattern.clone());
            }
        }

        info!(promql = %promql, source = ?ctx.source, "Query translated");

        Ok(Conversion {
            promql,
            explanation: Some(explanation).filter(|text| !text.is_empty()),
            warnings,
            suggestions,
        })
    }
}
