//! Durable run state: export phase, progress counters, and resume point.
//!
//! The checkpoint is the single source of truth for "where was this run when
//! the process last stopped". It is written atomically with fsync and guarded
//! by an advisory lock so two exporter processes cannot corrupt each other.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::order::AttachmentCounts;
use crate::OrderKind;

/// Current checkpoint schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// Maximum allowed checkpoint file size (1 MB) to prevent memory exhaustion
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 1024 * 1024;

/// Export phase. Phases only move forward: a run drains all invoices, then
/// all quotes, then finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Extracting invoices
    Invoices,
    /// Extracting quotes
    Quotes,
    /// Nothing left to do
    Done,
}

impl Phase {
    /// The order kind being extracted in this phase, if any.
    pub fn kind(self) -> Option<OrderKind> {
        match self {
            Phase::Invoices => Some(OrderKind::Invoice),
            Phase::Quotes => Some(OrderKind::Quote),
            Phase::Done => None,
        }
    }

    /// The phase that follows this one.
    pub fn next(self) -> Phase {
        match self {
            Phase::Invoices => Phase::Quotes,
            Phase::Quotes => Phase::Done,
            Phase::Done => Phase::Done,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Invoices => write!(f, "invoices"),
            Phase::Quotes => write!(f, "quotes"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// Persisted run state.
///
/// Completed-order truth lives in the record files themselves; the counters
/// here are informational. On resume the orchestrator replays the catalog and
/// skips any order whose record already exists, so a checkpoint that lags the
/// store by a few orders costs only redundant existence checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    schema_version: String,
    phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_visual_id: Option<String>,
    invoices_completed: u64,
    quotes_completed: u64,
    error_count: u64,
    attachment_totals: AttachmentCounts,
    created_at: i64,
    updated_at: i64,
}

impl Checkpoint {
    /// Fresh checkpoint at the start of the invoice phase.
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            phase: Phase::Invoices,
            last_visual_id: None,
            invoices_completed: 0,
            quotes_completed: 0,
            error_count: 0,
            attachment_totals: AttachmentCounts::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Visual id of the most recently completed order
    pub fn last_visual_id(&self) -> Option<&str> {
        self.last_visual_id.as_deref()
    }

    /// Invoices completed so far
    pub fn invoices_completed(&self) -> u64 {
        self.invoices_completed
    }

    /// Quotes completed so far
    pub fn quotes_completed(&self) -> u64 {
        self.quotes_completed
    }

    /// Orders recorded to the error ledger so far
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Running attachment totals across completed orders
    pub fn attachment_totals(&self) -> AttachmentCounts {
        self.attachment_totals
    }

    /// Record one completed order in the current phase.
    pub fn record_completed(&mut self, kind: OrderKind, visual_id: &str, counts: AttachmentCounts) {
        match kind {
            OrderKind::Invoice => self.invoices_completed += 1,
            OrderKind::Quote => self.quotes_completed += 1,
        }
        self.attachment_totals.add(&counts);
        self.last_visual_id = Some(visual_id.to_string());
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    /// Record one failed order.
    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    /// Advance to the next phase and clear the per-phase resume point.
    pub fn advance_phase(&mut self) {
        let from = self.phase;
        self.phase = self.phase.next();
        self.last_visual_id = None;
        self.updated_at = chrono::Utc::now().timestamp_millis();
        info!(from = %from, to = %self.phase, "Export phase advanced");
    }

    fn validate_schema_version(&self) -> Result<(), CheckpointError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(CheckpointError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: self.schema_version.clone(),
            });
        }
        Ok(())
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkpoint file storage with atomic writes and advisory locking.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store backed by `path`. A sibling `.lock` file coordinates access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, or start fresh if no file exists yet.
    pub fn load_or_default(&self) -> Result<Checkpoint, CheckpointError> {
        if self.path.exists() {
            self.load()
        } else {
            debug!(path = %self.path.display(), "No checkpoint file, starting fresh");
            Ok(Checkpoint::new())
        }
    }

    /// Load the checkpoint under a shared lock.
    pub fn load(&self) -> Result<Checkpoint, CheckpointError> {
        debug!(path = %self.path.display(), "Loading checkpoint");

        let lock_file = self.open_lock_file()?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| CheckpointError::Lock(format!("failed to acquire read lock: {e}")))?;

        let metadata =
            std::fs::metadata(&self.path).map_err(|e| CheckpointError::Io(e.to_string()))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(CheckpointError::FileTooLarge {
                size: metadata.len(),
                max: MAX_CHECKPOINT_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| CheckpointError::Io(e.to_string()))?;
        let checkpoint: Checkpoint = serde_json::from_str(&contents).map_err(|e| {
            warn!(error = %e, "Failed to deserialize checkpoint");
            CheckpointError::Deserialization(e.to_string())
        })?;

        checkpoint.validate_schema_version()?;

        info!(
            phase = %checkpoint.phase,
            invoices = checkpoint.invoices_completed,
            quotes = checkpoint.quotes_completed,
            errors = checkpoint.error_count,
            "Checkpoint loaded"
        );

        Ok(checkpoint)
    }

    /// Save the checkpoint under an exclusive lock with an atomic replace.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        debug!(
            path = %self.path.display(),
            phase = %checkpoint.phase,
            "Saving checkpoint"
        );

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CheckpointError::Io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        let lock_file = self.open_lock_file()?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| CheckpointError::Lock(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| CheckpointError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CheckpointError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CheckpointError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CheckpointError::Io(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(&self.path)
            .map_err(|e| CheckpointError::Io(format!("failed to persist temp file: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    fn open_lock_file(&self) -> Result<std::fs::File, CheckpointError> {
        let lock_path = self.path.with_extension("lock");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CheckpointError::Lock(format!("failed to create lock file: {e}")))
    }
}

/// Errors related to checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Schema version mismatch
    #[error("checkpoint schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}
