//! # Printavo Exporter Library
//!
//! A resumable, rate-limited extraction engine for Printavo order data.
//! Pulls every invoice and quote out of the Printavo GraphQL API v2 and writes
//! one fully merged JSON record per order, surviving crashes and restarts
//! without re-fetching finished orders.
//!
//! ## Why split queries?
//!
//! Printavo enforces a per-query complexity ceiling, so a large order's full
//! tree (header, line item groups, imprints, mockups, production files,
//! financial records) cannot be fetched in one request. The exporter issues
//! three bounded sub-queries per order and merges them into a single record.
//! A record only ever lands on disk fully merged; partial data is discarded.
//!
//! ## Quick Start
//!
//! ```no_run
//! use printavo_exporter::config::ExporterConfig;
//! use printavo_exporter::orchestrator::Orchestrator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExporterConfig::new(
//!     "owner@shop.com".to_string(),
//!     "live-api-token".to_string(),
//!     "./export".into(),
//! );
//! config.validate()?;
//!
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let summary = orchestrator.run().await?;
//! println!("exported {} orders", summary.total_completed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`] - One GraphQL exchange with Transient/Fatal classification
//! - [`scheduler`] - Global request pacing gate and bounded retry with backoff
//! - [`catalog`] - Cursor pagination over the invoice/quote listings
//! - [`fetch`] - The three complexity-bounded sub-queries per order
//! - [`merge`] - Sub-document merging and derived attachment counters
//! - [`store`] - Atomic-or-absent record persistence keyed by (kind, visual id)
//! - [`checkpoint`] - Durable phase/progress state for idempotent resume
//! - [`ledger`] - Append-only record of per-order failures
//! - [`orchestrator`] - Phase driver: invoices, then quotes, then done
//!
//! The run degrades gracefully: an order that keeps failing goes to the error
//! ledger and the run moves on. A non-empty ledger at completion is a normal
//! outcome that calls for manual follow-up, not a crash.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cursor pagination over the order listings
pub mod catalog;

/// Durable phase and progress state
pub mod checkpoint;

/// CLI command implementations
pub mod cli;

/// Tuning constants and exporter configuration
pub mod config;

/// Split fetching of the three per-order sub-queries
pub mod fetch;

/// Interrupt flag polled between orders
pub mod interrupt;

/// Append-only error ledger
pub mod ledger;

/// Sub-document merging
pub mod merge;

/// Production observability metrics
pub mod metrics;

/// Order data model
pub mod order;

/// Phase driver and resume logic
pub mod orchestrator;

/// Phase progress reporting
pub mod progress;

/// GraphQL documents for listings and sub-queries
pub mod queries;

/// Request pacing and retry
pub mod scheduler;

/// Record persistence
pub mod store;

/// Single GraphQL request/response exchange
pub mod transport;

// Re-export commonly used types
pub use order::OrderRecord;
pub use orchestrator::Orchestrator;

/// The two order categories Printavo exposes.
///
/// Invoices and quotes are structurally identical on the wire; they differ
/// only in the GraphQL root fields used to list and fetch them and in the
/// output partition their records land in. Invoices are extracted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Finalized orders (`invoices` / `invoice` root fields)
    Invoice,
    /// Quoted-but-not-invoiced orders (`quotes` / `quote` root fields)
    Quote,
}

impl OrderKind {
    /// GraphQL root field for the paginated listing query.
    pub fn listing_field(&self) -> &'static str {
        match self {
            OrderKind::Invoice => "invoices",
            OrderKind::Quote => "quotes",
        }
    }

    /// GraphQL root field for single-order queries.
    pub fn order_field(&self) -> &'static str {
        match self {
            OrderKind::Invoice => "invoice",
            OrderKind::Quote => "quote",
        }
    }

    /// Directory name for this kind's output partition.
    pub fn dir_name(&self) -> &'static str {
        self.listing_field()
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderKind::Invoice => "invoice",
            OrderKind::Quote => "quote",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" | "invoices" => Ok(OrderKind::Invoice),
            "quote" | "quotes" => Ok(OrderKind::Quote),
            _ => Err(format!("Invalid order kind: {s}")),
        }
    }
}

/// A (internal id, visual id) pair discovered by the catalog walker.
///
/// The internal id keys the GraphQL sub-queries; the visual id is the
/// shop-visible sequence number and serves as the durable storage key.
/// Produced fresh every run - the remote listing is the source of truth
/// for what exists now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Opaque GraphQL node id
    pub internal_id: String,
    /// Shop-visible sequence number, unique per kind
    pub visual_id: String,
}

impl OrderRef {
    /// Create a new order reference.
    pub fn new(internal_id: impl Into<String>, visual_id: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            visual_id: visual_id.into(),
        }
    }
}
