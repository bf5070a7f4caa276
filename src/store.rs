//! Record persistence.
//!
//! The storage contract the rest of the crate relies on is tiny: a
//! key-addressed existence predicate and an atomic-or-absent write. Resume
//! correctness hangs on exactly those two properties, so they live behind a
//! trait rather than raw filesystem calls.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::order::OrderRecord;
use crate::orchestrator::RunSummary;
use crate::OrderKind;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(String),

    /// Record could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-addressed record storage.
///
/// `exists` must be cheap - the orchestrator calls it for every order on
/// every run, and it is what makes restarting free for finished orders.
/// `put` must be atomic: after any crash, a record is either fully present
/// or absent.
pub trait RecordStore: Send + Sync {
    /// Whether a record is already persisted at (kind, visual id).
    fn exists(&self, kind: OrderKind, visual_id: &str) -> Result<bool, StoreError>;

    /// Persist a merged record. Callers check `exists` first; an existing
    /// record is never overwritten.
    fn put(&self, record: &OrderRecord) -> Result<(), StoreError>;

    /// Write the end-of-run summary.
    fn write_summary(&self, summary: &RunSummary) -> Result<(), StoreError>;
}

/// Filesystem-backed store: one pretty-printed JSON document per order at
/// `<root>/<kind>/<visualId>.json`, plus `<root>/summary.json`.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    /// Create a store rooted at `root`, creating the per-kind directories.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for kind in [OrderKind::Invoice, OrderKind::Quote] {
            std::fs::create_dir_all(root.join(kind.dir_name()))
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        Ok(Self { root })
    }

    /// Path of the record for (kind, visual id).
    pub fn record_path(&self, kind: OrderKind, visual_id: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{visual_id}.json"))
    }

    /// Path of the run summary.
    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.json")
    }

    /// Serialize `value` and atomically replace `path` with it.
    ///
    /// Write to a named temp file in the destination directory, flush and
    /// fsync it, rename over the target, then fsync the directory so the
    /// rename itself is durable. A crash at any point leaves either the old
    /// content or the new - never a torn file.
    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| StoreError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StoreError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StoreError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StoreError::Io(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| StoreError::Io(format!("failed to persist temp file: {e}")))?;

        if let Ok(dir) = OpenOptions::new().read(true).open(parent) {
            let _ = dir.sync_all();
        }

        Ok(())
    }
}

impl RecordStore for FsRecordStore {
    fn exists(&self, kind: OrderKind, visual_id: &str) -> Result<bool, StoreError> {
        Ok(self.record_path(kind, visual_id).exists())
    }

    fn put(&self, record: &OrderRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.kind, &record.visual_id);
        self.write_atomic(&path, record)?;
        debug!(
            kind = %record.kind,
            visual_id = %record.visual_id,
            path = %path.display(),
            "Persisted order record"
        );
        Ok(())
    }

    fn write_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        let path = self.summary_path();
        self.write_atomic(&path, summary)?;
        info!(path = %path.display(), "Wrote run summary");
        Ok(())
    }
}
