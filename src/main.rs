//! Main entry point for the printavo-exporter CLI

use clap::Parser;
use printavo_exporter::cli::{Cli, Commands};
use printavo_exporter::interrupt::{self, InterruptFlag};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("printavo_exporter=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Install the process-wide interrupt flag and Ctrl+C handler
    let interrupt = InterruptFlag::shared();
    interrupt::install_interrupt(interrupt.clone());
    tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing current order and saving progress...");
                interrupt.raise();
            }
        }
    });

    let result = match cli.command {
        Commands::Export(ref args) => args
            .execute(&cli, interrupt.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Status(ref status_cmd) => status_cmd
            .execute(&cli)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Errors(ref errors_cmd) => errors_cmd
            .execute(&cli)
            .await
            .map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
