//! Chart-type suggestion for executed queries.
//!
//! Purely syntactic: looks at the query text and the shape of the result,
//! never at the values.

use lazy_static::lazy_static;
use promql_adapters::{QueryData, QueryResult, ResultType};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Largest series count still readable as a pie chart.
const MAX_PIE_SLICES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    TimeSeries,
    Bar,
    Pie,
    Gauge,
    Table,
    Tree,
}

lazy_static! {
    static ref RANKING: Regex = Regex::new(r"\b(topk|bottomk)\s*\(").unwrap();
    static ref PARTITION: Regex = Regex::new(r"\b(count|sum)\s+by\b").unwrap();
    static ref GROUPING: Regex = Regex::new(r"\bby\s*\(([^)]*)\)").unwrap();
}

/// Suggests a chart for `query` given its result. First matching rule wins.
pub fn suggest_chart(query: &str, data: &QueryData) -> ChartType {
    let query = query.to_lowercase();
    let series = data.series();

    if RANKING.is_match(&query) {
        return ChartType::Bar;
    }

    if query.contains("histogram_quantile") || data.result_type == ResultType::Matrix {
        return ChartType::TimeSeries;
    }

    let single_unlabelled = series.len() == 1
        && series[0].metric.keys().all(|label| label == "__name__");
    if matches!(data.result, QueryResult::Sample(_)) || single_unlabelled {
        return ChartType::Gauge;
    }

    if PARTITION.is_match(&query) && series.len() <= MAX_PIE_SLICES {
        return ChartType::Pie;
    }

    let grouped_labels = GROUPING
        .captures(&query)
        .map(|caps| {
            caps[1]
                .split(',')
                .filter(|label| !label.trim().is_empty())
                .count()
        })
        .unwrap_or(0);
    if grouped_labels >= 2 {
        return ChartType::Tree;
    }

    ChartType::Table
}
