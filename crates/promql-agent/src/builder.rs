//! Deterministic PromQL assembly.

use promql_core::QueryContext;

/// Warning emitted when the context carries no metric.
pub const NO_METRIC_WARNING: &str = "no metric specified";

/// Aggregation operators that accept a `by (...)` clause directly.
const AGGREGATION_OPERATORS: &[&str] = &[
    "sum", "avg", "min", "max", "count", "group", "stddev", "stdvar",
];

/// Range functions: their argument must be a range vector.
const RANGE_FUNCTIONS: &[&str] = &["rate", "irate", "increase", "delta", "idelta", "deriv", "changes", "resets"];

pub fn is_aggregation_operator(name: &str) -> bool {
    AGGREGATION_OPERATORS.contains(&name)
}

pub fn is_range_function(name: &str) -> bool {
    RANGE_FUNCTIONS.contains(&name) || name.ends_with("_over_time")
}

/// Assembles `<agg>(<metric>{<k="v",...>}[<range>])`.
///
/// Each part is emitted only when its source field is set. Labels are
/// rendered in key order. Grouping renders as `<agg> by (<labels>) (...)`;
/// range functions are wrapped in `sum by (...)` so the grouping stays valid.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Returns the query and any warnings. An empty query means nothing
    /// could be built; the warnings say why.
    pub fn build(&self, ctx: &QueryContext) -> (String, Vec<String>) {
        let metric = ctx.main_metric.trim();
        if metric.is_empty() {
            return (String::new(), vec![NO_METRIC_WARNING.to_string()]);
        }

        let mut selector = metric.to_string();

        if !ctx.labels.is_empty() {
            let matchers: Vec<String> = ctx
                .labels
                .iter()
                .map(|(key, value)| format!("{}=\"{}\"", key, escape_label_value(value)))
                .collect();
            selector.push('{');
            selector.push_str(&matchers.join(","));
            selector.push('}');
        }

        if !ctx.time_range.is_zero() {
            selector.push_str(&format!("[{}]", ctx.time_range.selector()));
        }

        let aggregation = ctx.aggregation.trim();
        if aggregation.is_empty() {
            return (selector, Vec::new());
        }

        let query = if ctx.group_by.is_empty() {
            format!("{}({})", aggregation, selector)
        } else {
            let grouping = ctx.group_by.join(", ");
            if is_aggregation_operator(aggregation) {
                format!("{} by ({}) ({})", aggregation, grouping, selector)
            } else {
                format!("sum by ({}) ({}({}))", grouping, aggregation, selector)
            }
        };

        (query, Vec::new())
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
