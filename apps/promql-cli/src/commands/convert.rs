//! Convert command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn run(client: &ApiClient, question: &str, format: OutputFormat) -> Result<()> {
    let response = client.convert(question).await?;
    if output::print_structured(&response, format)? {
        return Ok(());
    }

    println!("{}", response.promql.cyan().bold());
    if let Some(explanation) = &response.explanation {
        println!();
        println!("{}", explanation);
    }
    for warning in &response.warnings {
        output::warning(warning);
    }
    if !response.suggestions.is_empty() {
        println!();
        println!("{}", "Related queries:".bold());
        for suggestion in &response.suggestions {
            println!("  {}", suggestion.dimmed());
        }
    }

    Ok(())
}
