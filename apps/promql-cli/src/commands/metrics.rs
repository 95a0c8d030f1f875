//! Metrics command

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn run(client: &ApiClient, filter: Option<&str>, format: OutputFormat) -> Result<()> {
    let names: Vec<String> = client
        .metrics()
        .await?
        .into_iter()
        .filter(|name| filter.map_or(true, |f| name.contains(f)))
        .collect();

    if output::print_structured(&names, format)? {
        return Ok(());
    }

    for name in &names {
        println!("{}", name);
    }
    output::key_value("Total", &names.len().to_string());
    Ok(())
}
