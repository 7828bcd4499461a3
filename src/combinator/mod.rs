//! Promise combinators.
//!
//! This module provides the core combinators:
//!
//! - [`all`]: Wait for every child to succeed, fail fast on the first failure
//! - [`any`]: Settle with whichever child settles first
//! - [`map`]: Transform a successful value, pass failure through unchanged
//!
//! Every combinator registers completion listeners and returns immediately;
//! nothing here blocks. The only state shared between listeners is a
//! per-invocation [`SettleGate`](crate::sync::SettleGate) and, for `all`, a
//! [`Countdown`](crate::sync::Countdown), both driven by atomic
//! read-modify-write operations.
//!
//! # Exactly Once
//!
//! For every combinator and every interleaving of child completions, the
//! target promise settles exactly once. Completions arriving after the
//! decision are ignored.

pub mod join;
pub mod map;
pub mod select;

pub use join::{all, all_values, join_all, join_all_values};
pub use map::{map, try_map};
pub use select::{any, race};

use crate::config::PromiseConfig;
use crate::promise::Promise;
use crate::tracing_compat::debug;
use crate::types::Outcome;

/// Settles a combinator's target, logging if something else got there first.
fn settle<P>(target: &Promise<P>, outcome: Outcome<P>, combinator: &'static str) {
    if target.complete(outcome).is_err() {
        debug!(
            promise = %target.id(),
            combinator,
            "target was settled outside the combinator"
        );
    }
}

/// Configuration for a parent created on the caller's behalf.
fn parent_config<T>(children: &[Promise<T>]) -> PromiseConfig {
    children
        .first()
        .map_or_else(PromiseConfig::default, |child| *child.config())
}
