//! Progress tracking for long-running extractions.
//!
//! A full export can take hours at the paced request rate, so the phase loop
//! emits periodic progress lines. This module owns the cadence logic and the
//! rate and remaining-time estimates behind them.

use std::time::{Duration, Instant};

use crate::OrderKind;

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
const MIN_RUN_DURATION: Duration = Duration::from_secs(15);

/// Per-phase progress state.
#[derive(Debug, Clone)]
pub struct PhaseProgress {
    /// Which listing this phase is draining
    pub kind: OrderKind,
    /// Orders in the catalog for this phase
    pub total: u64,
    /// Orders extracted this run
    pub completed: u64,
    /// Orders skipped because their record already existed
    pub skipped: u64,
    /// Orders that exhausted retries and went to the ledger
    pub failed: u64,
    start_time: Instant,
    last_update: Instant,
    update_interval: Duration,
}

impl PhaseProgress {
    /// Start tracking a phase over `total` catalogued orders.
    pub fn new(kind: OrderKind, total: u64) -> Self {
        let now = Instant::now();
        Self {
            kind,
            total,
            completed: 0,
            skipped: 0,
            failed: 0,
            start_time: now,
            last_update: now,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }

    /// Orders handled so far, by any outcome.
    pub fn processed(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }

    /// Extraction rate over freshly completed orders (orders per second).
    /// Skipped orders are excluded so the rate reflects paced request work.
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.completed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Estimated time to drain the remaining orders at the current rate.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let rate = self.rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed());
        if remaining == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// Whether enough time has passed to emit another progress line.
    pub fn should_emit_update(&self) -> bool {
        self.processed() > 0
            && self.start_time.elapsed() >= MIN_RUN_DURATION
            && self.last_update.elapsed() >= self.update_interval
    }

    /// Call after emitting a progress log to reset the cadence timer.
    pub fn mark_emitted(&mut self) {
        self.last_update = Instant::now();
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] {}: {}/{} orders",
            self.kind.listing_field(),
            self.processed(),
            self.total
        )];

        if self.total > 0 {
            let pct = (self.processed() as f64 / self.total as f64) * 100.0;
            parts.push(format!("- {pct:.1}% complete"));
        }

        parts.push(format!(
            "({} extracted, {} skipped, {} failed)",
            self.completed, self.skipped, self.failed
        ));

        let rate = self.rate();
        if rate > 0.0 {
            parts.push(format!("at {rate:.2} orders/sec"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
