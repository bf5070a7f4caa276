//! Run interruption on an order boundary.
//!
//! Ctrl+C never kills the process mid-order. The phase loop polls the flag
//! between orders, saves the checkpoint, and returns an interrupted summary;
//! the next run resumes from the saved phase with finished records skipped.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Cloneable handle to a run's interrupt flag.
pub type SharedInterrupt = Arc<InterruptFlag>;

static PROCESS_INTERRUPT: OnceCell<SharedInterrupt> = OnceCell::new();

/// Make `flag` the process-wide interrupt, picked up by orchestrators built
/// without an explicit handle. The first installation wins.
pub fn install_interrupt(flag: SharedInterrupt) {
    let _ = PROCESS_INTERRUPT.set(flag);
}

/// The installed process-wide interrupt flag, if any.
pub fn installed_interrupt() -> Option<SharedInterrupt> {
    PROCESS_INTERRUPT.get().cloned()
}

/// A raise-once flag checked between orders.
#[derive(Debug, Default)]
pub struct InterruptFlag {
    raised: AtomicBool,
}

impl InterruptFlag {
    /// Create a shared flag.
    pub fn shared() -> SharedInterrupt {
        Arc::new(Self::default())
    }

    /// Raise the flag. Later calls are no-ops; the stop is logged once.
    pub fn raise(&self) {
        if !self.raised.swap(true, Ordering::SeqCst) {
            info!("Interrupt raised; stopping at the next order boundary");
        }
    }

    /// Whether the run should stop at the next order boundary.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
