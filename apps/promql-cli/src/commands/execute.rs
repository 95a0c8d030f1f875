//! Execute command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ExecuteRequest, SeriesResult};
use crate::output::{self, OutputFormat};

fn labels(series: &SeriesResult) -> String {
    let name = series.metric.get("__name__").cloned().unwrap_or_default();
    let pairs: Vec<String> = series
        .metric
        .iter()
        .filter(|(key, _)| key.as_str() != "__name__")
        .map(|(key, value)| format!("{}=\"{}\"", key, value))
        .collect();
    format!("{}{{{}}}", name, pairs.join(", "))
}

pub async fn run(client: &ApiClient, request: ExecuteRequest, format: OutputFormat) -> Result<()> {
    let response = client.execute(&request).await?;
    if output::print_structured(&response, format)? {
        return Ok(());
    }

    output::key_value("Result type", &response.result_type);
    output::key_value("Suggested chart", &response.chart_type);
    println!();

    let series = response.series();
    if series.is_empty() {
        println!("{}", response.result);
        return Ok(());
    }

    for s in &series {
        println!("{}", labels(s).bold());
        if let Some((ts, value)) = &s.value {
            println!("  {} @ {}", value.cyan(), ts);
        }
        for (ts, value) in &s.values {
            println!("  {} @ {}", value.cyan(), ts);
        }
    }

    Ok(())
}
