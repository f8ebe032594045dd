//! Platform health CLI
//!
//! A command-line tool for checking the platform health report, pinging
//! the aggregator and reading its Prometheus gauges.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{metrics, ping, status};
use std::process::ExitCode;

/// Platform health CLI
#[derive(Parser)]
#[command(name = "phctl")]
#[command(author, version, about = "CLI for the Platform Health Aggregator", long_about = None)]
pub struct Cli {
    /// Aggregator URL (can also be set via PHCTL_URL env var)
    #[arg(long, env = "PHCTL_URL", default_value = "http://localhost:8088")]
    pub url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the aggregate platform health report (exits 1 when unhealthy)
    Status,

    /// Check that the aggregator itself is up
    Ping,

    /// Show the Prometheus health gauges
    Metrics {
        /// Only show series whose line contains this text
        #[arg(long)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.url)?;

    let ok = match cli.command {
        Commands::Status => status::show_status(&client, cli.format).await?,
        Commands::Ping => ping::ping(&client, cli.format).await?,
        Commands::Metrics { filter } => {
            metrics::show_metrics(&client, filter.as_deref(), cli.format).await?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
