//! Health check command

use anyhow::{bail, Result};
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    let healthy = health["status"] == "ok";

    if !output::print_structured(&health, format)? {
        let status = if healthy {
            "Healthy".green()
        } else {
            "Degraded".yellow()
        };
        println!("{}: {}", "Status".bold(), status);

        if let Some(components) = health.as_object() {
            for (name, up) in components.iter().filter(|(name, _)| *name != "status") {
                let icon = if up.as_bool().unwrap_or(false) {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!("  {} {}", icon, name);
            }
        }
    }

    if !healthy {
        bail!("service degraded");
    }
    Ok(())
}
