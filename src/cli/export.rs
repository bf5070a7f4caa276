//! Export command implementation

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::ExporterConfig;
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::interrupt::SharedInterrupt;

use super::CliError;

/// Printavo Exporter CLI
#[derive(Parser, Debug)]
#[command(name = "printavo-exporter")]
#[command(about = "Export every invoice and quote from a Printavo account", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Output directory for records, checkpoint and ledger
    #[arg(long, global = true, default_value = "export")]
    pub output_dir: PathBuf,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run (or resume) a full export
    Export(ExportArgs),

    /// Show checkpoint progress for an export directory
    Status(super::StatusCommand),

    /// List orders recorded in the error ledger
    Errors(super::ErrorsCommand),
}

/// Export command arguments
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Printavo account email, sent as the `email` header
    #[arg(long, env = "PRINTAVO_EMAIL")]
    pub email: String,

    /// Printavo API token, sent as the `token` header
    #[arg(long, env = "PRINTAVO_TOKEN")]
    pub token: String,

    /// GraphQL endpoint URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Minimum delay between requests in milliseconds
    #[arg(long)]
    pub min_delay_ms: Option<u64>,

    /// Maximum attempts per request (range: 1-20)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: Option<u32>,

    /// Listing page size (range: 1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: Option<u32>,

    /// Prometheus scrape address (e.g. 0.0.0.0:9090). Off when omitted.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl ExportArgs {
    /// Build an [`ExporterConfig`] from the arguments and defaults.
    pub fn to_config(&self, cli: &Cli) -> ExporterConfig {
        let mut config = ExporterConfig::new(
            self.email.clone(),
            self.token.clone(),
            cli.output_dir.clone(),
        );
        if let Some(ref url) = self.api_url {
            config.api_url = url.clone();
        }
        if let Some(ms) = self.min_delay_ms {
            config.min_request_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(size) = self.page_size {
            config.page_size = size;
        }
        config
    }

    /// Execute the export command.
    pub async fn execute(&self, cli: &Cli, interrupt: SharedInterrupt) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::InvalidArgument(format!("metrics init failed: {e}")))?;
        }

        let config = self.to_config(cli);
        config.validate()?;

        info!(
            api_url = %config.api_url,
            output_dir = %config.output_dir.display(),
            "Starting export"
        );

        let orchestrator = Orchestrator::from_config(&config)?.with_interrupt(interrupt);
        let summary = orchestrator.run().await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&summary),
            OutputFormat::Human => output_human(&summary),
        }

        Ok(())
    }
}

fn output_json(summary: &RunSummary) {
    let output = serde_json::json!({
        "success": !summary.interrupted,
        "interrupted": summary.interrupted,
        "invoices_completed": summary.invoices_completed,
        "quotes_completed": summary.quotes_completed,
        "orders_skipped": summary.orders_skipped,
        "orders_failed": summary.orders_failed,
        "attachments_total": summary.attachment_totals.total(),
    });
    println!("{}", serde_json::to_string(&output).unwrap_or_default());
}

fn output_human(summary: &RunSummary) {
    if summary.interrupted {
        println!("\nExport interrupted - progress saved, rerun to resume");
    } else {
        println!("\nExport completed!");
    }
    println!("Invoices: {}", summary.invoices_completed);
    println!("Quotes: {}", summary.quotes_completed);
    if summary.orders_skipped > 0 {
        println!("Skipped (already exported): {}", summary.orders_skipped);
    }
    println!("Attachments referenced: {}", summary.attachment_totals.total());
    if summary.orders_failed > 0 {
        println!(
            "Failed: {} (see errors.jsonl, or run the `errors` command)",
            summary.orders_failed
        );
    }
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
