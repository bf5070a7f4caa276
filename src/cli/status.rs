//! Status and error-ledger inspection commands

use clap::Parser;

use crate::checkpoint::CheckpointStore;
use crate::ledger::ErrorLedger;

use super::export::{Cli, OutputFormat};
use super::CliError;

/// Show checkpoint progress for an export directory
#[derive(Parser, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    /// Print the checkpoint state, if any.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = CheckpointStore::new(cli.output_dir.join("checkpoint.json"));
        if !store.path().exists() {
            println!("No checkpoint found in {}", cli.output_dir.display());
            return Ok(());
        }

        let checkpoint = store.load()?;

        match cli.output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "phase": checkpoint.phase().to_string(),
                    "invoices_completed": checkpoint.invoices_completed(),
                    "quotes_completed": checkpoint.quotes_completed(),
                    "error_count": checkpoint.error_count(),
                    "last_visual_id": checkpoint.last_visual_id(),
                    "attachments_total": checkpoint.attachment_totals().total(),
                });
                println!("{}", serde_json::to_string(&output).unwrap_or_default());
            }
            OutputFormat::Human => {
                println!("Phase: {}", checkpoint.phase());
                println!("Invoices completed: {}", checkpoint.invoices_completed());
                println!("Quotes completed: {}", checkpoint.quotes_completed());
                println!("Errors recorded: {}", checkpoint.error_count());
                if let Some(visual_id) = checkpoint.last_visual_id() {
                    println!("Last completed order: #{visual_id}");
                }
            }
        }

        Ok(())
    }
}

/// List orders recorded in the error ledger
#[derive(Parser, Debug)]
pub struct ErrorsCommand {}

impl ErrorsCommand {
    /// Print every ledger entry.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let ledger = ErrorLedger::new(cli.output_dir.join("errors.jsonl"));
        let records = ledger.read_all()?;

        match cli.output_format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&records).unwrap_or_default());
            }
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("Error ledger is empty");
                    return Ok(());
                }
                println!("{} failed order(s):", records.len());
                for record in &records {
                    println!(
                        "  {} #{} ({}): {}",
                        record.kind, record.visual_id, record.occurred_at, record.message
                    );
                }
            }
        }

        Ok(())
    }
}
