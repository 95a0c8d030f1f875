//! Validate command

use anyhow::{bail, Result};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn run(client: &ApiClient, promql: &str, format: OutputFormat) -> Result<()> {
    let response = client.validate(promql).await?;
    if !output::print_structured(&response, format)? {
        if response.valid {
            output::success("Query is valid");
        } else {
            output::error(response.error.as_deref().unwrap_or("Query is invalid"));
        }
        for warning in &response.warnings {
            output::warning(warning);
        }
    }

    if !response.valid {
        bail!("validation failed");
    }
    Ok(())
}
