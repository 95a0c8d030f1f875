//! PromQL translator CLI
//!
//! Command-line front end for the translation server's HTTP API.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;

use crate::client::{ApiClient, ExecuteRequest};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "promql",
    version,
    about = "Translate monitoring questions into PromQL",
    long_about = "A command-line interface for the PromQL translation server.\n\n\
                  Convert natural-language questions, validate and run queries,\n\
                  and browse the metrics Prometheus knows about."
)]
struct Cli {
    /// API endpoint URL
    #[arg(
        short,
        long,
        env = "PROMQL_API_URL",
        default_value = "http://localhost:8080"
    )]
    api_url: String,

    /// Output format (text, json, yaml)
    #[arg(
        short,
        long,
        default_value = "text",
        value_parser = ["text", "json", "yaml"]
    )]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a question into PromQL
    Convert {
        /// The question, e.g. "error rate of the api over the last hour"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Check a PromQL query against Prometheus
    Validate {
        /// The PromQL query
        promql: String,
    },

    /// Run a PromQL query
    Execute {
        /// The PromQL query
        query: String,

        /// Range start (RFC 3339)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Range end (RFC 3339)
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Range step, e.g. 30s
        #[arg(long)]
        step: Option<String>,

        /// Evaluation time for instant queries (RFC 3339)
        #[arg(long, conflicts_with = "start")]
        time: Option<String>,
    },

    /// List discovered metric names
    Metrics {
        /// Only show names containing this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Check API connectivity and health
    Health,
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let client = ApiClient::new(&cli.api_url)?;

    match &cli.command {
        Commands::Convert { question } => {
            commands::convert::run(&client, &question.join(" "), format).await
        }
        Commands::Validate { promql } => commands::validate::run(&client, promql, format).await,
        Commands::Execute {
            query,
            start,
            end,
            step,
            time,
        } => {
            let request = ExecuteRequest {
                query: query.clone(),
                start: start.clone(),
                end: end.clone(),
                step: step.clone(),
                timestamp: time.clone(),
            };
            commands::execute::run(&client, request, format).await
        }
        Commands::Metrics { filter } => {
            commands::metrics::run(&client, filter.as_deref(), format).await
        }
        Commands::Health => commands::health::run(&client, format).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if cli.verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("{}: {}", "Caused by".yellow(), cause);
                }
            }
            ExitCode::FAILURE
        }
    }
}
