//! Prompt templates for the fallback completion and the explainer.

use promql_adapters::SchemaSnapshot;
use promql_core::QueryContext;

use crate::patterns::MetricPattern;

const BUILDER_PROMPT: &str = r#"You are a PromQL query builder.
Available metrics and their labels:
{metrics}
{services}{patterns}
Valid PromQL examples:
- Simple sum: sum(prometheus_http_response_size_bytes_sum)
- Rate with time: rate(prometheus_http_requests_total[5m])
- Filtered sum: sum(prometheus_http_requests_total{code="200"})

Return ONLY a JSON object with these fields:
{
  "metric": "exact_metric_name_from_list",
  "labels": {"label": "value"},
  "timeRange": "5m",
  "aggregation": "",
  "groupBy": []
}

Rules:
1. Exact metric names only
2. Only use existing label values
3. Omit timeRange for sum operations
4. Use appropriate aggregation:
   - sum: for totals and sizes
   - rate: for per-second metrics
   - avg: for averages
   - count: for occurrences
   - increase: for total increases
   Leave aggregation empty if none is needed
5. groupBy lists label names to group by, or is empty"#;

const EXPLANATION_PROMPT: &str = r#"Provide a clear, concise explanation for the given PromQL query in natural language.
Query: {promql}
User Question: {question}
Primary Metric: {metric}
Aggregation Type: {aggregation}
Labels: {labels}
Explain the query's purpose and behavior in one well-formed sentence. Keep it succinct and informative."#;

/// One line per metric: `name with labels: k=[v1, v2]`.
pub fn describe_catalog(snapshot: &SchemaSnapshot) -> String {
    snapshot
        .metrics
        .values()
        .map(|schema| {
            if schema.label_values.is_empty() {
                return schema.name.clone();
            }
            let labels: Vec<String> = schema
                .label_values
                .iter()
                .map(|(label, values)| {
                    let values: Vec<&str> = values.iter().map(String::as_str).collect();
                    format!("{}=[{}]", label, values.join(", "))
                })
                .collect();
            format!("{} with labels: {}", schema.name, labels.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_services(snapshot: &SchemaSnapshot) -> String {
    let services = snapshot.by_job();
    if services.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nMetrics by service:\n");
    for (service, metrics) in services {
        out.push_str(&format!("- {}: {}\n", service, metrics.join(", ")));
    }
    out
}

fn describe_patterns(patterns: &[MetricPattern]) -> String {
    if patterns.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nRelevant query patterns:\n");
    for pattern in patterns {
        let window = pattern.time_windows.first().map(String::as_str).unwrap_or("5m");
        out.push_str(&format!("- {}\n", pattern.render(window)));
    }
    out
}

/// Fallback prompt embedding the metric catalog and the normalized question.
pub fn builder_prompt(
    snapshot: &SchemaSnapshot,
    patterns: &[MetricPattern],
    normalized_query: &str,
) -> String {
    let system = BUILDER_PROMPT
        .replace("{metrics}", &describe_catalog(snapshot))
        .replace("{services}", &describe_services(snapshot))
        .replace("{patterns}", &describe_patterns(patterns));
    format!("{}\n\nQuery: {}", system, normalized_query)
}

pub fn explanation_prompt(ctx: &QueryContext, promql: &str) -> String {
    let labels: Vec<String> = ctx
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    EXPLANATION_PROMPT
        .replace("{promql}", promql)
        .replace("{question}", &ctx.query)
        .replace("{metric}", &ctx.main_metric)
        .replace("{aggregation}", &ctx.aggregation)
        .replace("{labels}", &format!("map[{}]", labels.join(" ")))
}
