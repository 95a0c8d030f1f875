//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "promql-server",
    about = "Natural-language to PromQL translation server",
    version,
    long_about = "Translates monitoring questions into PromQL, validates them against \
                  Prometheus, and serves the result over HTTP."
)]
pub struct Args {
    /// Path to configuration file (YAML or TOML); defaults and environment
    /// variables are used when it does not exist
    #[arg(short, long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// HTTP server port, overrides the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Enable JSON log format (useful for production)
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == Some(0) {
            anyhow::bail!("port must be non-zero");
        }
        Ok(())
    }
}
