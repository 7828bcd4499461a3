//! Lock-free settlement primitives.
//!
//! Each combinator invocation owns a fresh instance of these; nothing here is
//! process-wide.
//!
//! # Primitives
//!
//! - [`SettleGate`]: One-shot test-and-set gate; exactly one caller wins
//! - [`Countdown`]: Remaining-count that reports the single transition to zero

mod countdown;
mod gate;

pub use countdown::{Countdown, CountdownStep};
pub use gate::SettleGate;
