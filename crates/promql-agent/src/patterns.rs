//! Knowledge-pattern catalog.
//!
//! Maps semantic concepts ("error rate", "latency") to query templates.
//! Matching is a coverage heuristic: a template is offered when every one of
//! its categories appears as a substring of some available metric name. The
//! results are suggestions and are never used as the final query.

use parking_lot::RwLock;
use promql_adapters::SchemaSnapshot;
use promql_core::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Placeholder replaced by a range window when a template is rendered.
pub const TIME_PLACEHOLDER: &str = "[time]";

const MAX_SIMILAR_METRICS: usize = 3;
const RELATED_SUFFIXES: &[&str] = &["_count", "_sum", "_bucket"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPattern {
    pub pattern: String,
    pub time_windows: Vec<String>,
    pub labels: Vec<String>,
    pub categories: Vec<String>,
}

impl MetricPattern {
    fn new(pattern: &str, time_windows: &[&str], categories: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            time_windows: time_windows.iter().map(|w| w.to_string()).collect(),
            labels: Vec::new(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Template text with `[time]` replaced by `[window]`.
    pub fn render(&self, window: &str) -> String {
        self.pattern
            .replace(TIME_PLACEHOLDER, &format!("[{}]", window))
    }

    fn is_covered_by(&self, available: &[String]) -> bool {
        self.categories
            .iter()
            .all(|category| available.iter().any(|metric| metric.contains(category.as_str())))
    }
}

/// A cached metric related to a resolved one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarMetric {
    pub name: String,
    pub pattern: String,
    pub description: String,
    pub labels: Vec<String>,
}

impl From<&SimilarMetric> for Rule {
    fn from(metric: &SimilarMetric) -> Self {
        Rule {
            pattern: metric.pattern.clone(),
            metric_type: metric.name.clone(),
            labels: metric.labels.clone(),
            aggregation: String::new(),
        }
    }
}

pub struct KnowledgePatterns {
    patterns: RwLock<BTreeMap<String, Vec<MetricPattern>>>,
}

impl Default for KnowledgePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgePatterns {
    /// Catalog seeded with the built-in concepts.
    pub fn new() -> Self {
        let catalog = Self::empty();

        catalog.add_pattern(
            "error_rate",
            vec![
                MetricPattern::new(
                    "rate(errors[time]) / rate(total[time])",
                    &["5m", "1h", "24h"],
                    &["errors", "total"],
                ),
                MetricPattern::new(
                    "sum(rate(errors{status=~\"5..\"}[time])) / sum(rate(total[time]))",
                    &["5m", "1h", "24h"],
                    &["errors", "http"],
                )
                .with_labels(&["status"]),
                MetricPattern::new(
                    "sum(rate(grpc_server_handled_total{grpc_code!=\"OK\"}[time])) / sum(rate(grpc_server_handled_total[time]))",
                    &["5m", "1h"],
                    &["grpc", "errors"],
                )
                .with_labels(&["grpc_code"]),
            ],
        );

        catalog.add_pattern(
            "latency",
            vec![
                MetricPattern::new(
                    "histogram_quantile(0.95, rate(duration_bucket[time]))",
                    &["5m", "1h"],
                    &["duration", "_bucket"],
                ),
                MetricPattern::new(
                    "rate(duration_sum[time]) / rate(duration_count[time])",
                    &["5m", "1h"],
                    &["duration", "_sum", "_count"],
                ),
            ],
        );

        catalog.add_pattern(
            "utilization",
            vec![
                MetricPattern::new(
                    "sum by (instance) (rate(cpu_seconds_total[time]))",
                    &["5m", "1h"],
                    &["cpu", "seconds_total"],
                )
                .with_labels(&["instance"]),
                MetricPattern::new(
                    "memory_used_bytes / memory_total_bytes * 100",
                    &[],
                    &["memory", "bytes"],
                ),
            ],
        );

        catalog
    }

    pub fn empty() -> Self {
        Self {
            patterns: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers or replaces the templates of a concept.
    pub fn add_pattern(&self, concept: impl Into<String>, patterns: Vec<MetricPattern>) {
        self.patterns.write().insert(concept.into(), patterns);
    }

    /// Templates whose concept is named in `query` and whose categories are
    /// all covered by `available` metric names.
    ///
    /// A concept matches by its literal name or with underscores read as
    /// spaces, so "error rate" selects `error_rate`.
    pub fn find_patterns(&self, query: &str, available: &[String]) -> Vec<MetricPattern> {
        let query = query.to_lowercase();
        let patterns = self.patterns.read();

        let matches: Vec<MetricPattern> = patterns
            .iter()
            .filter(|(concept, _)| {
                query.contains(concept.as_str()) || query.contains(&concept.replace('_', " "))
            })
            .flat_map(|(_, templates)| templates.iter())
            .filter(|template| template.is_covered_by(available))
            .cloned()
            .collect();

        debug!(count = matches.len(), "Matched knowledge patterns");
        matches
    }

    /// Up to three cached metrics related to `metric_name`.
    ///
    /// Related means the same base name with a histogram/summary suffix, or
    /// at least two label names in common. Candidates are visited in name
    /// order.
    pub fn find_similar_metrics(
        &self,
        metric_name: &str,
        snapshot: &SchemaSnapshot,
    ) -> Vec<SimilarMetric> {
        let Some(original) = snapshot.get(metric_name) else {
            return Vec::new();
        };
        let base = base_name(metric_name);

        snapshot
            .metrics
            .values()
            .filter(|schema| schema.name != metric_name)
            .filter(|schema| {
                let same_family = schema.name.starts_with(base)
                    && RELATED_SUFFIXES
                        .iter()
                        .any(|suffix| schema.name.ends_with(suffix));
                let common_labels = original
                    .labels
                    .keys()
                    .filter(|label| schema.labels.contains_key(label.as_str()))
                    .count();
                same_family || common_labels >= 2
            })
            .take(MAX_SIMILAR_METRICS)
            .map(|schema| SimilarMetric {
                name: schema.name.clone(),
                pattern: pattern_for_metric(&schema.name),
                description: describe_metric(&schema.name, base),
                labels: schema.labels.keys().cloned().collect(),
            })
            .collect()
    }
}

fn base_name(metric_name: &str) -> &str {
    RELATED_SUFFIXES
        .iter()
        .find_map(|suffix| metric_name.strip_suffix(suffix))
        .unwrap_or(metric_name)
}

fn pattern_for_metric(metric_name: &str) -> String {
    if metric_name.ends_with("_bucket") {
        format!("histogram_quantile(0.95, rate({}[5m]))", metric_name)
    } else if metric_name.ends_with("_count") || metric_name.ends_with("_total") {
        format!("rate({}[5m])", metric_name)
    } else if let Some(base) = metric_name.strip_suffix("_sum") {
        format!("rate({}[5m]) / rate({}_count[5m])", metric_name, base)
    } else {
        metric_name.to_string()
    }
}

fn describe_metric(metric_name: &str, base: &str) -> String {
    if metric_name.ends_with("_sum") {
        format!("Total sum for {}", base)
    } else if metric_name.ends_with("_count") {
        format!("Request count for {}", base)
    } else if metric_name.ends_with("_bucket") {
        format!("Duration buckets for calculating quantiles of {}", base)
    } else {
        format!("Related metric: {}", metric_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use promql_adapters::{MetricSchema, MetricType};
    use std::collections::BTreeSet;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn schema(name: &str, labels: &[&str]) -> MetricSchema {
        MetricSchema {
            name: name.to_string(),
            metric_type: MetricType::infer(name),
            help: String::new(),
            labels: labels
                .iter()
                .map(|l| (l.to_string(), "x".to_string()))
                .collect(),
            label_values: labels
                .iter()
                .map(|l| (l.to_string(), BTreeSet::from(["x".to_string()])))
                .collect(),
            last_scrape: Utc::now(),
        }
    }

    fn snapshot(schemas: Vec<MetricSchema>) -> SchemaSnapshot {
        SchemaSnapshot {
            metrics: schemas.into_iter().map(|s| (s.name.clone(), s)).collect(),
            refreshed_at: None,
        }
    }

    #[test]
    fn test_error_rate_patterns_filtered_by_availability() {
        let catalog = KnowledgePatterns::new();
        let available = names(&["http_errors_total", "http_total"]);

        let matches = catalog.find_patterns("what's our error rate", &available);

        assert_eq!(matches.len(), 2);
        assert!(matches
            .iter()
            .all(|p| p.is_covered_by(&available)));
        assert!(matches.iter().all(|p| !p.pattern.contains("grpc")));
    }

    #[test]
    fn test_concept_name_matches_literally() {
        let catalog = KnowledgePatterns::new();
        let available = names(&["request_duration_seconds_bucket"]);
        let matches = catalog.find_patterns("p95 latency for checkout", &available);
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].render("5m"),
            "histogram_quantile(0.95, rate(duration_bucket[5m]))"
        );
    }

    #[test]
    fn test_categories_are_metric_name_fragments() {
        let catalog = KnowledgePatterns::new();
        let available = names(&["node_cpu_seconds_total", "node_memory_bytes"]);

        let matches = catalog.find_patterns("cpu utilization per node", &available);
        assert_eq!(matches.len(), 2);

        let matches = catalog.find_patterns("cpu utilization", &names(&["node_cpu_seconds_total"]));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].pattern.contains("cpu_seconds_total"));
    }

    #[test]
    fn test_no_concept_no_patterns() {
        let catalog = KnowledgePatterns::new();
        let available = names(&["http_errors_total", "http_total"]);
        assert!(catalog.find_patterns("memory usage", &available).is_empty());
    }

    #[test]
    fn test_add_pattern_replaces_concept() {
        let catalog = KnowledgePatterns::empty();
        catalog.add_pattern("saturation", vec![MetricPattern::new("queue_depth", &[], &["queue"])]);
        let available = names(&["queue_depth"]);
        assert_eq!(catalog.find_patterns("saturation now", &available).len(), 1);

        catalog.add_pattern("saturation", Vec::new());
        assert!(catalog.find_patterns("saturation now", &available).is_empty());
    }

    #[test]
    fn test_similar_metrics_by_suffix_and_labels() {
        let catalog = KnowledgePatterns::new();
        let snapshot = snapshot(vec![
            schema("http_request_duration_seconds_count", &["job"]),
            schema("http_request_duration_seconds_bucket", &["le"]),
            schema("http_request_duration_seconds_sum", &[]),
            schema("node_load1", &["instance"]),
            schema("process_open_fds", &["job", "instance"]),
            schema("up", &["job", "instance"]),
        ]);

        let similar = catalog.find_similar_metrics("http_request_duration_seconds_count", &snapshot);
        let found: Vec<_> = similar.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            found,
            vec![
                "http_request_duration_seconds_bucket",
                "http_request_duration_seconds_sum"
            ]
        );
        assert_eq!(
            similar[0].pattern,
            "histogram_quantile(0.95, rate(http_request_duration_seconds_bucket[5m]))"
        );
        assert_eq!(
            similar[1].description,
            "Total sum for http_request_duration_seconds"
        );

        let similar = catalog.find_similar_metrics("up", &snapshot);
        let found: Vec<_> = similar.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(found, vec!["process_open_fds"]);
    }

    #[test]
    fn test_similar_metrics_capped_at_three() {
        let catalog = KnowledgePatterns::new();
        let snapshot = snapshot(vec![
            schema("a", &["job", "instance"]),
            schema("b", &["job", "instance"]),
            schema("c", &["job", "instance"]),
            schema("d", &["job", "instance"]),
            schema("e", &["job", "instance"]),
        ]);
        assert_eq!(catalog.find_similar_metrics("a", &snapshot).len(), 3);
        assert!(catalog.find_similar_metrics("missing", &snapshot).is_empty());
    }
}
