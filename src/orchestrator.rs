//! Phase driver: walks the catalog, extracts each order, and keeps the
//! checkpoint honest.
//!
//! The run moves through the invoice phase, then the quote phase, then Done.
//! Within a phase every catalogued order is either skipped (record already on
//! disk), extracted and persisted, or sent to the error ledger. Order-level
//! failures never abort the run, fatal ones included; only catalog walks,
//! configuration, and state persistence are process-fatal, because without
//! them no remaining order can be handled at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{CatalogError, CatalogWalker};
use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::config::{ConfigError, ExporterConfig};
use crate::fetch::{FetchError, SplitFetcher};
use crate::ledger::{ErrorLedger, ErrorRecord, LedgerError};
use crate::merge::{merge_order, MergeError};
use crate::metrics;
use crate::order::AttachmentCounts;
use crate::progress::PhaseProgress;
use crate::scheduler::{PacingGate, Scheduler};
use crate::interrupt::{installed_interrupt, SharedInterrupt};
use crate::store::{FsRecordStore, RecordStore, StoreError};
use crate::transport::{HttpGraphTransport, TransportError};
use crate::{OrderKind, OrderRef};

/// Run-aborting errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport could not be constructed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A listing page could not be fetched
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkpoint persistence failed
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Record persistence failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error ledger write failed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// End-of-run accounting, persisted as `summary.json` when the run reaches
/// Done.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Invoices extracted across all runs, per the checkpoint
    pub invoices_completed: u64,
    /// Quotes extracted across all runs, per the checkpoint
    pub quotes_completed: u64,
    /// Orders skipped this run because their record already existed
    pub orders_skipped: u64,
    /// Orders in the error ledger, per the checkpoint
    pub orders_failed: u64,
    /// Attachment totals across all completed orders
    pub attachment_totals: AttachmentCounts,
    /// Whether this run stopped early on an interrupt
    pub interrupted: bool,
    /// When this run started
    pub started_at: Option<DateTime<Utc>>,
    /// When this run finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Total orders completed across both phases.
    pub fn total_completed(&self) -> u64 {
        self.invoices_completed + self.quotes_completed
    }
}

/// Drives a full export run.
pub struct Orchestrator {
    scheduler: Scheduler,
    store: Arc<dyn RecordStore>,
    checkpoint_store: CheckpointStore,
    ledger: ErrorLedger,
    config: ExporterConfig,
    interrupt: Option<SharedInterrupt>,
}

impl Orchestrator {
    /// Assemble an orchestrator from pre-built parts. Used by tests to
    /// substitute a scripted transport behind the scheduler.
    pub fn new(
        scheduler: Scheduler,
        store: Arc<dyn RecordStore>,
        checkpoint_store: CheckpointStore,
        ledger: ErrorLedger,
        config: ExporterConfig,
    ) -> Self {
        Self {
            scheduler,
            store,
            checkpoint_store,
            ledger,
            config,
            interrupt: installed_interrupt(),
        }
    }

    /// Build the production orchestrator: HTTP transport, filesystem store,
    /// checkpoint and ledger under the configured output directory.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ExportError> {
        config.validate()?;

        let transport = HttpGraphTransport::new(config)?;
        let gate = Arc::new(PacingGate::new(config.min_request_delay));
        let scheduler = Scheduler::new(
            Arc::new(transport),
            gate,
            config.max_attempts,
            config.retry_base_delay,
        );

        let store = FsRecordStore::new(&config.output_dir)?;
        let checkpoint_store = CheckpointStore::new(config.output_dir.join("checkpoint.json"));
        let ledger = ErrorLedger::new(config.output_dir.join("errors.jsonl"));

        Ok(Self::new(
            scheduler,
            Arc::new(store),
            checkpoint_store,
            ledger,
            config.clone(),
        ))
    }

    /// Use an explicit interrupt flag instead of the process-wide one.
    pub fn with_interrupt(mut self, interrupt: SharedInterrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Run the export to completion (or until interrupted).
    ///
    /// Resuming is implicit: the checkpoint supplies the starting phase and
    /// the store's existence checks make finished orders free to revisit.
    pub async fn run(self) -> Result<RunSummary, ExportError> {
        let started_at = Utc::now();
        let mut checkpoint = self.checkpoint_store.load_or_default()?;

        info!(
            phase = %checkpoint.phase(),
            invoices = checkpoint.invoices_completed(),
            quotes = checkpoint.quotes_completed(),
            "Starting export run"
        );

        let mut skipped_this_run = 0u64;
        let mut interrupted = false;

        while let Some(kind) = checkpoint.phase().kind() {
            let outcome = self.run_phase(kind, &mut checkpoint).await?;
            skipped_this_run += outcome.skipped;

            if outcome.interrupted {
                interrupted = true;
                break;
            }

            checkpoint.advance_phase();
            self.checkpoint_store.save(&checkpoint)?;
        }

        let summary = RunSummary {
            invoices_completed: checkpoint.invoices_completed(),
            quotes_completed: checkpoint.quotes_completed(),
            orders_skipped: skipped_this_run,
            orders_failed: checkpoint.error_count(),
            attachment_totals: checkpoint.attachment_totals(),
            interrupted,
            started_at: Some(started_at),
            finished_at: Some(Utc::now()),
        };

        if interrupted {
            info!(
                completed = summary.total_completed(),
                "Run interrupted, checkpoint saved"
            );
            return Ok(summary);
        }

        self.store.write_summary(&summary)?;

        info!(
            invoices = summary.invoices_completed,
            quotes = summary.quotes_completed,
            skipped = summary.orders_skipped,
            failed = summary.orders_failed,
            attachments = summary.attachment_totals.total(),
            "Export run complete"
        );

        if summary.orders_failed > 0 {
            warn!(
                failed = summary.orders_failed,
                ledger = %self.ledger.path().display(),
                "Some orders failed; see the error ledger for follow-up"
            );
        }

        Ok(summary)
    }

    /// Drain one phase: walk the catalog, then process every order.
    async fn run_phase(
        &self,
        kind: OrderKind,
        checkpoint: &mut Checkpoint,
    ) -> Result<PhaseOutcome, ExportError> {
        let walker = CatalogWalker::new(&self.scheduler, self.config.page_size);
        let refs = walker.walk(kind).await?;

        info!(kind = %kind, orders = refs.len(), "Catalog walk complete");

        let fetcher = SplitFetcher::new(&self.scheduler);
        let mut progress = PhaseProgress::new(kind, refs.len() as u64);
        let mut completed_since_flush = 0u64;

        for order in &refs {
            if self.interrupted() {
                self.checkpoint_store.save(checkpoint)?;
                return Ok(PhaseOutcome {
                    skipped: progress.skipped,
                    interrupted: true,
                });
            }

            if self.store.exists(kind, &order.visual_id)? {
                progress.skipped += 1;
                metrics::record_order_skipped(kind);
                continue;
            }

            match self.extract_order(&fetcher, kind, order).await {
                Ok(counts) => {
                    checkpoint.record_completed(kind, &order.visual_id, counts);
                    metrics::record_order_extracted(kind);
                    progress.completed += 1;
                    completed_since_flush += 1;

                    if completed_since_flush >= self.config.checkpoint_interval {
                        self.checkpoint_store.save(checkpoint)?;
                        completed_since_flush = 0;
                    }
                }
                Err(message) => {
                    self.ledger.append(&ErrorRecord::new(
                        kind,
                        &order.visual_id,
                        &order.internal_id,
                        message,
                    ))?;
                    checkpoint.record_error();
                    self.checkpoint_store.save(checkpoint)?;
                    completed_since_flush = 0;
                    metrics::record_order_failed(kind);
                    progress.failed += 1;
                }
            }

            if progress.should_emit_update() {
                info!("{}", progress.format_progress());
                progress.mark_emitted();
            }
        }

        self.checkpoint_store.save(checkpoint)?;

        info!(
            kind = %kind,
            extracted = progress.completed,
            skipped = progress.skipped,
            failed = progress.failed,
            "Phase complete"
        );

        Ok(PhaseOutcome {
            skipped: progress.skipped,
            interrupted: false,
        })
    }

    /// Fetch, merge, and persist one order. Returns the attachment counts of
    /// the stored record, or the failure message destined for the ledger.
    /// Every failure here is an order-level failure, including fatal
    /// transport outcomes on a sub-query: the order is recorded and the run
    /// moves on to the next one.
    async fn extract_order(
        &self,
        fetcher: &SplitFetcher<'_>,
        kind: OrderKind,
        order: &OrderRef,
    ) -> Result<AttachmentCounts, String> {
        let parts = fetcher.fetch(kind, order).await.map_err(|e: FetchError| {
            warn!(kind = %kind, visual_id = %order.visual_id, error = %e, "Fetch failed");
            e.to_string()
        })?;

        let record = merge_order(kind, parts).map_err(|e: MergeError| {
            warn!(kind = %kind, visual_id = %order.visual_id, error = %e, "Merge failed");
            e.to_string()
        })?;

        let counts = record.attachment_counts;
        self.store.put(&record).map_err(|e| e.to_string())?;

        Ok(counts)
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|flag| flag.is_raised())
    }
}

struct PhaseOutcome {
    skipped: u64,
    interrupted: bool,
}
