use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::duration::format_duration;

/// Default range window applied when the question names none.
pub const DEFAULT_TIME_RANGE: Duration = Duration::from_secs(300);

/// Time window a query covers.
///
/// Only `duration` feeds query assembly; `start`/`end` are carried for
/// range execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl TimeRange {
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            start: None,
            end: None,
            duration,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.duration.is_zero()
    }

    /// Range selector text without brackets, e.g. `5m`.
    pub fn selector(&self) -> String {
        format_duration(self.duration)
    }
}

/// Where the main metric of a context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Resolved by rule-based entity extraction against the schema cache
    Rules,
    /// Resolved by the language-model fallback
    Fallback,
}

/// Auxiliary query suggestion attached to a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Ready-to-run or template query text
    pub pattern: String,
    /// Concept or metric family the suggestion belongs to
    pub metric_type: String,
    /// Label names the suggestion relies on
    pub labels: Vec<String>,
    pub aggregation: String,
}

/// Structured representation of one natural-language question.
///
/// Created per request and discarded after the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// The question exactly as received
    pub query: String,
    /// Intent operation name (`rate`, `avg`, ...), empty when none matched
    pub intent: String,
    pub main_metric: String,
    /// Label matchers; ordered so assembly is reproducible
    pub labels: BTreeMap<String, String>,
    pub time_range: TimeRange,
    pub aggregation: String,
    pub group_by: Vec<String>,
    pub rules: Vec<Rule>,
    pub source: ContextSource,
}

impl QueryContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            intent: String::new(),
            main_metric: String::new(),
            labels: BTreeMap::new(),
            time_range: TimeRange::from_duration(DEFAULT_TIME_RANGE),
            aggregation: String::new(),
            group_by: Vec::new(),
            rules: Vec::new(),
            source: ContextSource::Rules,
        }
    }

    pub fn has_metric(&self) -> bool {
        !self.main_metric.trim().is_empty()
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.main_metric = metric.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: impl Into<String>) -> Self {
        self.aggregation = aggregation.into();
        self
    }

    pub fn with_time_range(mut self, duration: Duration) -> Self {
        self.time_range = TimeRange::from_duration(duration);
        self
    }

    pub fn with_group_by(mut self, label: impl Into<String>) -> Self {
        self.group_by.push(label.into());
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
