//! Atomic remaining-count for N-way completion.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Result of a single [`Countdown::count_down`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Decremented; this many arrivals are still outstanding.
    Remaining(usize),
    /// This call took the count from one to zero.
    Reached,
    /// The count was already zero; nothing changed.
    Exhausted,
}

/// Counts arrivals down from `N` to zero without locks.
///
/// Exactly one caller observes [`CountdownStep::Reached`]. Calls after zero
/// observe [`CountdownStep::Exhausted`]; the count never wraps.
#[derive(Debug)]
pub struct Countdown {
    remaining: AtomicUsize,
}

impl Countdown {
    /// Creates a countdown expecting `n` arrivals.
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(n),
        }
    }

    /// Records one arrival.
    #[inline]
    pub fn count_down(&self) -> CountdownStep {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => CountdownStep::Reached,
            Ok(previous) => CountdownStep::Remaining(previous - 1),
            Err(_) => CountdownStep::Exhausted,
        }
    }

    /// Returns the number of outstanding arrivals.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Returns true once every expected arrival has been recorded.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }
}
