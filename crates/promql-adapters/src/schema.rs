//! Metric schema cache.
//!
//! Holds an immutable [`SchemaSnapshot`] behind an [`ArcSwap`]. Readers take
//! the current `Arc` and never block; a refresh builds a complete new
//! snapshot off to the side and swaps it in. Refreshes are single-flight and
//! skipped while the current snapshot is younger than the TTL.

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeZone, Utc};
use promql_core::{with_cancellation, CancellationToken};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::prometheus::{MetricsBackend, Series};
use crate::{AdapterError, AdapterResult};

/// Catch-all selector used to discover every series the backend knows.
pub const DISCOVERY_QUERY: &str = r#"{__name__=~".+"}"#;

const NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    /// Infers the type from Prometheus naming conventions.
    pub fn infer(name: &str) -> Self {
        if name.ends_with("_total") {
            MetricType::Counter
        } else if name.ends_with("_bucket") || name.ends_with("_sum") || name.ends_with("_count") {
            MetricType::Histogram
        } else {
            MetricType::Gauge
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSchema {
    pub name: String,
    pub metric_type: MetricType,
    /// Always empty; no metadata endpoint is consulted
    pub help: String,
    /// Labels of the last series seen for this name
    pub labels: BTreeMap<String, String>,
    /// Every value observed per label across all series
    pub label_values: BTreeMap<String, BTreeSet<String>>,
    pub last_scrape: DateTime<Utc>,
}

/// One generation of the cache.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub metrics: BTreeMap<String, MetricSchema>,
    pub refreshed_at: Option<Instant>,
}

impl SchemaSnapshot {
    fn from_series(series: &[Series], refreshed_at: Instant) -> Self {
        let mut metrics: BTreeMap<String, MetricSchema> = BTreeMap::new();

        for s in series {
            let Some(name) = s.metric.get(NAME_LABEL) else {
                continue;
            };

            let labels: BTreeMap<String, String> = s
                .metric
                .iter()
                .filter(|(k, _)| k.as_str() != NAME_LABEL)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let last_scrape = s
                .value
                .as_ref()
                .and_then(|sample| Utc.timestamp_millis_opt((sample.0 * 1000.0) as i64).single())
                .unwrap_or_else(Utc::now);

            let entry = metrics.entry(name.clone()).or_insert_with(|| MetricSchema {
                name: name.clone(),
                metric_type: MetricType::infer(name),
                help: String::new(),
                labels: BTreeMap::new(),
                label_values: BTreeMap::new(),
                last_scrape,
            });

            for (key, value) in &labels {
                entry
                    .label_values
                    .entry(key.clone())
                    .or_default()
                    .insert(value.clone());
            }
            entry.labels = labels;
            entry.last_scrape = entry.last_scrape.max(last_scrape);
        }

        Self {
            metrics,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MetricSchema> {
        self.metrics.get(name)
    }

    /// Sorted metric names.
    pub fn names(&self) -> Vec<String> {
        self.metrics.keys().cloned().collect()
    }

    /// Metric names grouped by the values of their `job` label.
    ///
    /// Metrics without a `job` label are omitted.
    pub fn by_job(&self) -> BTreeMap<String, Vec<String>> {
        let mut services: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for schema in self.metrics.values() {
            if let Some(jobs) = schema.label_values.get("job") {
                for job in jobs {
                    services
                        .entry(job.clone())
                        .or_default()
                        .push(schema.name.clone());
                }
            }
        }
        services
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => at.elapsed() >= ttl,
            None => true,
        }
    }
}

/// TTL-refreshed cache of available metrics.
pub struct MetricSchemaCache {
    backend: Arc<dyn MetricsBackend>,
    snapshot: ArcSwap<SchemaSnapshot>,
    refresh_lock: Mutex<()>,
    ttl: Duration,
}

impl MetricSchemaCache {
    pub fn new(backend: Arc<dyn MetricsBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            snapshot: ArcSwap::from_pointee(SchemaSnapshot::default()),
            refresh_lock: Mutex::new(()),
            ttl,
        }
    }

    /// Current snapshot. Never blocks and never triggers a refresh.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.snapshot.load_full()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.snapshot.load().names()
    }

    /// Refreshes from the backend unless the current snapshot is fresh.
    ///
    /// On failure the previous snapshot stays visible.
    #[instrument(skip(self, cancel))]
    pub async fn refresh(&self, cancel: &CancellationToken) -> AdapterResult<Arc<SchemaSnapshot>> {
        let current = self.snapshot.load_full();
        if !current.is_stale(self.ttl) {
            return Ok(current);
        }

        let _guard = with_cancellation(cancel, async {
            Ok::<_, AdapterError>(self.refresh_lock.lock().await)
        })
        .await?;

        // Another caller may have refreshed while we waited.
        let current = self.snapshot.load_full();
        if !current.is_stale(self.ttl) {
            debug!("Schema refreshed by a concurrent caller");
            return Ok(current);
        }

        let data = self.backend.query(DISCOVERY_QUERY, None, cancel).await?;
        let next = Arc::new(SchemaSnapshot::from_series(data.series(), Instant::now()));

        info!(metrics = next.metrics.len(), "Metric schema refreshed");
        debug!(names = ?next.metrics.keys().collect::<Vec<_>>(), "Discovered metrics");

        self.snapshot.store(next.clone());
        Ok(next)
    }
}
