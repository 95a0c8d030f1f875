//! Named-entity extraction.
//!
//! Sweeps a normalized query three times, independently, tagging
//! identifier-shaped tokens as metrics, `key=value` tokens as labels, and
//! duration tokens as time ranges. The metric sweep is deliberately
//! over-inclusive; callers must filter candidates against the set of known
//! metric names.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Metric,
    Label,
    Time,
}

/// A tagged span of the normalized query. `start..end` is a byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    /// Token text; `key=value` for labels
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl Entity {
    /// Label key and value, for label entities.
    pub fn label_pair(&self) -> Option<(&str, &str)> {
        if self.entity_type != EntityType::Label {
            return None;
        }
        self.value.split_once('=')
    }
}

lazy_static! {
    static ref METRIC_PATTERN: Regex = Regex::new(r"\b[a-zA-Z_:][a-zA-Z0-9_:]*\b").unwrap();
    static ref LABEL_PATTERN: Regex =
        Regex::new(r#"\b([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*["']?([^"'}\s,]+)["']?"#).unwrap();
    static ref TIME_PATTERN: Regex = Regex::new(r"\b(\d+(?:ms|[smhdw]))\b").unwrap();
}

/// Regex-based entity extractor. Performs no semantic validation.
#[derive(Debug, Clone, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts metric, label, and time entities, in that sweep order.
    pub fn extract(&self, query: &str) -> Vec<Entity> {
        let mut entities = Vec::new();

        for m in METRIC_PATTERN.find_iter(query) {
            entities.push(Entity {
                entity_type: EntityType::Metric,
                value: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }

        for caps in LABEL_PATTERN.captures_iter(query) {
            let (Some(whole), Some(key), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            entities.push(Entity {
                entity_type: EntityType::Label,
                value: format!("{}={}", key.as_str(), value.as_str()),
                start: whole.start(),
                end: whole.end(),
            });
        }

        for m in TIME_PATTERN.find_iter(query) {
            entities.push(Entity {
                entity_type: EntityType::Time,
                value: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }

        trace!(count = entities.len(), "extracted entities");
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of_type(entities: &[Entity], entity_type: EntityType) -> Vec<&Entity> {
        entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    #[test]
    fn test_selector_with_duration() {
        let entities = EntityExtractor::new().extract(r#"cpu_usage{job="api"} for 5m"#);

        let labels = of_type(&entities, EntityType::Label);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label_pair(), Some(("job", "api")));

        let times = of_type(&entities, EntityType::Time);
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].value, "5m");
    }

    #[test]
    fn test_metric_sweep_is_over_inclusive() {
        let entities = EntityExtractor::new().extract("rate of http_requests_total");
        let metrics: Vec<_> = of_type(&entities, EntityType::Metric)
            .into_iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(metrics, vec!["rate", "of", "http_requests_total"]);
    }

    #[test]
    fn test_spans_point_into_input() {
        let query = "errors with code=500 over 1h";
        let entities = EntityExtractor::new().extract(query);
        for entity in &entities {
            let slice = &query[entity.start..entity.end];
            match entity.entity_type {
                EntityType::Label => assert_eq!(slice, "code=500"),
                _ => assert_eq!(slice, entity.value),
            }
        }
    }

    #[test]
    fn test_multiple_labels() {
        let entities = EntityExtractor::new().extract(r#"up{job="node",instance='host:9100'}"#);
        let pairs: Vec<_> = of_type(&entities, EntityType::Label)
            .into_iter()
            .filter_map(|e| e.label_pair())
            .collect();
        assert_eq!(pairs, vec![("job", "node"), ("instance", "host:9100")]);
    }

    #[test]
    fn test_digit_prefixed_tokens_are_not_metrics() {
        let entities = EntityExtractor::new().extract("5m 24h");
        assert!(of_type(&entities, EntityType::Metric).is_empty());
        assert_eq!(of_type(&entities, EntityType::Time).len(), 2);
    }

    #[test]
    fn test_label_pair_only_for_labels() {
        let entity = Entity {
            entity_type: EntityType::Time,
            value: "5m".to_string(),
            start: 0,
            end: 2,
        };
        assert_eq!(entity.label_pair(), None);
    }
}
