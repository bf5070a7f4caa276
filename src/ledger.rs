//! Append-only error ledger.
//!
//! Every order that exhausts its retries lands here as one JSON line, so a
//! failed run leaves a machine-readable list of exactly what to re-attempt.
//! Appends never rewrite earlier lines; a crash mid-append loses at most the
//! line being written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::OrderKind;

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(String),

    /// Entry could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One failed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Which listing the order came from
    pub kind: OrderKind,
    /// Human-facing order number
    pub visual_id: String,
    /// Opaque GraphQL node id
    pub internal_id: String,
    /// What went wrong, including which sub-document failed
    pub message: String,
    /// When the failure was recorded
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Build a record stamped with the current time.
    pub fn new(
        kind: OrderKind,
        visual_id: impl Into<String>,
        internal_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            visual_id: visual_id.into(),
            internal_id: internal_id.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// JSONL file of failed orders.
pub struct ErrorLedger {
    path: PathBuf,
}

impl ErrorLedger {
    /// Ledger backed by `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to disk.
    pub fn append(&self, record: &ErrorRecord) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::Io(e.to_string()))?;
        }

        let line = serde_json::to_string(record)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Io(e.to_string()))?;

        writeln!(file, "{line}").map_err(|e| LedgerError::Io(e.to_string()))?;
        file.flush().map_err(|e| LedgerError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| LedgerError::Io(e.to_string()))?;

        warn!(
            kind = %record.kind,
            visual_id = %record.visual_id,
            message = %record.message,
            "Order recorded in error ledger"
        );

        Ok(())
    }

    /// Read all entries. Unparseable lines are skipped with a warning rather
    /// than failing the whole read, since a crash can truncate the last line.
    pub fn read_all(&self) -> Result<Vec<ErrorRecord>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path).map_err(|e| LedgerError::Io(e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| LedgerError::Io(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ErrorRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Skipping malformed ledger line");
                }
            }
        }

        Ok(records)
    }
}
