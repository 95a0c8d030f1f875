//! Query-context extraction.
//!
//! Normalizes the question, runs intent classification and entity
//! extraction side by side, and resolves a metric against the schema cache.
//! When no metric entity resolves, a single completion call fills in the
//! context. Entity-extracted labels and windows always win over the
//! completion's.

use promql_adapters::{
    CompletionProvider, MetricGraph, MetricSchemaCache, SchemaSnapshot,
};
use promql_core::{
    parse_duration, CancellationToken, ContextSource, QueryContext, Rule, DEFAULT_TIME_RANGE,
};
use promql_nlp::{Entity, EntityType, Intent, NlpEngine, NlpError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::builder::{is_aggregation_operator, is_range_function};
use crate::error::{AgentError, Result};
use crate::patterns::KnowledgePatterns;
use crate::prompts;

/// Aggregation operators that have an `<op>_over_time` counterpart.
const OVER_TIME_OPERATORS: &[&str] = &["avg", "sum", "count", "min", "max", "stddev", "stdvar"];

/// Shape the fallback completion must return.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FallbackContext {
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    time_range: Option<String>,
    #[serde(default)]
    aggregation: Option<String>,
    #[serde(default)]
    group_by: Option<Vec<String>>,
}

/// Locates the first balanced `{...}` span, ignoring braces inside strings.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_fallback(raw: &str) -> Result<FallbackContext> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AgentError::format("no JSON object in response", raw))?;
    serde_json::from_str(json).map_err(|e| AgentError::format(e.to_string(), raw))
}

fn label_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

pub struct ContextExtractor {
    nlp: Arc<dyn NlpEngine>,
    schema: Arc<MetricSchemaCache>,
    llm: Arc<dyn CompletionProvider>,
    patterns: Arc<KnowledgePatterns>,
    graph: Option<Arc<dyn MetricGraph>>,
}

impl ContextExtractor {
    pub fn new(
        nlp: Arc<dyn NlpEngine>,
        schema: Arc<MetricSchemaCache>,
        llm: Arc<dyn CompletionProvider>,
        patterns: Arc<KnowledgePatterns>,
    ) -> Self {
        Self {
            nlp,
            schema,
            llm,
            patterns,
            graph: None,
        }
    }

    pub fn with_graph(mut self, graph: Arc<dyn MetricGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Builds a [`QueryContext`] for `query`.
    #[instrument(skip(self, cancel), fields(query_len = query.len()))]
    pub async fn extract(&self, query: &str, cancel: &CancellationToken) -> Result<QueryContext> {
        let normalized = self.nlp.normalize(query).await?;

        let snapshot = self
            .schema
            .refresh(cancel)
            .await
            .map_err(AgentError::from_upstream)?;

        let (intent, entities) = tokio::join!(
            self.nlp.classify_intent(&normalized),
            self.nlp.extract_entities(&normalized)
        );
        let intent = intent?;
        let entities = entities?;

        let mut ctx = QueryContext::new(query);
        ctx.intent = intent
            .operation
            .map(|op| op.as_str().to_string())
            .unwrap_or_default();
        if let Some(label) = intent.group_by() {
            ctx.group_by.push(label.to_string());
        }

        let mut window = explicit_window(&entities, &intent)?;
        let metric = resolve_metric(&entities, &snapshot);
        for (key, value) in entities.iter().filter_map(Entity::label_pair) {
            ctx.labels.insert(key.to_string(), value.to_string());
        }

        let available = snapshot.names();
        let patterns = self.patterns.find_patterns(&normalized, &available);

        match metric {
            Some(metric) => {
                info!(metric = %metric, "Metric resolved from entities");
                ctx.main_metric = metric;
                ctx.aggregation = ctx.intent.clone();
                ctx.source = ContextSource::Rules;
            }
            None => {
                info!("No metric entity resolved, using completion fallback");
                let prompt = prompts::builder_prompt(&snapshot, &patterns, &normalized);
                let raw = self
                    .llm
                    .complete(&prompt, cancel)
                    .await
                    .map_err(AgentError::from_completion)?;
                debug!(response = %raw, "Fallback response");

                let fallback = parse_fallback(&raw)?;
                if window.is_none() {
                    window = fallback_window(&fallback)?;
                }
                merge_fallback(&mut ctx, fallback);
                ctx.source = ContextSource::Fallback;
            }
        }

        apply_window(&mut ctx, window);
        self.attach_rules(&mut ctx, &snapshot, &patterns, cancel).await;

        debug!(?ctx, "Extracted query context");
        Ok(ctx)
    }

    async fn attach_rules(
        &self,
        ctx: &mut QueryContext,
        snapshot: &SchemaSnapshot,
        patterns: &[crate::patterns::MetricPattern],
        cancel: &CancellationToken,
    ) {
        let window = if ctx.time_range.is_zero() {
            promql_core::format_duration(DEFAULT_TIME_RANGE)
        } else {
            ctx.time_range.selector()
        };

        for pattern in patterns {
            ctx.rules.push(Rule {
                pattern: pattern.render(&window),
                metric_type: String::new(),
                labels: pattern.labels.clone(),
                aggregation: String::new(),
            });
        }

        if !ctx.has_metric() {
            return;
        }

        for similar in self.patterns.find_similar_metrics(&ctx.main_metric, snapshot) {
            ctx.rules.push(Rule::from(&similar));
        }

        if let Some(graph) = &self.graph {
            match graph.related_metrics(&ctx.main_metric, cancel).await {
                Ok(related) => {
                    for metric in related {
                        ctx.rules.push(Rule {
                            pattern: metric.name,
                            metric_type: metric.metric_type,
                            labels: Vec::new(),
                            aggregation: String::new(),
                        });
                    }
                }
                Err(e) => warn!("Graph lookup failed, skipping: {}", e),
            }
        }
    }
}

/// First metric entity that names a cached metric.
fn resolve_metric(entities: &[Entity], snapshot: &SchemaSnapshot) -> Option<String> {
    entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Metric)
        .find(|e| snapshot.contains(&e.value))
        .map(|e| e.value.clone())
}

/// Window named by a time entity, else by the intent's time frame.
///
/// The text comes from the question itself, so an unusable duration is an
/// input error.
fn explicit_window(entities: &[Entity], intent: &Intent) -> Result<Option<Duration>> {
    let text = entities
        .iter()
        .find(|e| e.entity_type == EntityType::Time)
        .map(|e| e.value.as_str())
        .or_else(|| intent.time_frame.map(|frame| frame.window()));

    match text {
        Some(text) => parse_duration(text)
            .map(Some)
            .map_err(|e| NlpError::validation(e.to_string()).into()),
        None => Ok(None),
    }
}

fn fallback_window(fallback: &FallbackContext) -> Result<Option<Duration>> {
    match fallback.time_range.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => parse_duration(text)
            .map(Some)
            .map_err(|e| AgentError::format(format!("invalid time range format: {}", e), text)),
        _ => Ok(None),
    }
}

/// Fallback values fill only what entity extraction left unset.
fn merge_fallback(ctx: &mut QueryContext, fallback: FallbackContext) {
    ctx.main_metric = fallback.metric.unwrap_or_default().trim().to_string();

    for (key, value) in fallback.labels.unwrap_or_default() {
        ctx.labels.entry(key).or_insert_with(|| label_value(value));
    }

    ctx.aggregation = fallback.aggregation.unwrap_or_default().trim().to_string();

    if ctx.group_by.is_empty() {
        ctx.group_by = fallback.group_by.unwrap_or_default();
    }
}

/// Fits the range selector to the aggregation.
///
/// Range functions always get a window. Plain aggregation operators become
/// `<op>_over_time` when a window was given and drop the range otherwise.
fn apply_window(ctx: &mut QueryContext, window: Option<Duration>) {
    let aggregation = ctx.aggregation.as_str();

    let range = if aggregation.is_empty() {
        window.unwrap_or(Duration::ZERO)
    } else if is_range_function(aggregation) {
        window.unwrap_or(DEFAULT_TIME_RANGE)
    } else if is_aggregation_operator(aggregation) {
        match window {
            Some(window) if OVER_TIME_OPERATORS.contains(&aggregation) => {
                ctx.aggregation = format!("{}_over_time", aggregation);
                window
            }
            _ => Duration::ZERO,
        }
    } else {
        window.unwrap_or(Duration::ZERO)
    };

    ctx.time_range = promql_core::TimeRange::from_duration(range);
}
