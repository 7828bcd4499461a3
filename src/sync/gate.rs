//! One-shot gate guarding a single settlement.

use std::sync::atomic::{AtomicBool, Ordering};

/// A one-shot gate: the first [`try_close`](Self::try_close) wins, every
/// later call loses.
///
/// Combinators put a gate in front of every path that settles their target
/// promise, so concurrent completions never race to settle it twice.
#[derive(Debug, Default)]
pub struct SettleGate {
    closed: AtomicBool,
}

impl SettleGate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }

    /// Closes the gate. Returns `true` only for the call that closed it.
    #[inline]
    pub fn try_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns true once some caller has closed the gate.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
