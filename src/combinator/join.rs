//! All combinator: wait for every child to succeed.
//!
//! # Semantics
//!
//! `all(parent, children)`:
//! 1. Register a listener on every child
//! 2. On a child failure, reject `parent` with that child's cause (fail fast)
//! 3. On a child success, count down; when the count reaches zero, resolve
//!    `parent`
//!
//! `parent` carries no aggregated value: it signals completion. Use
//! [`all_values`] to collect the children's values in their original order.
//!
//! # Invariants
//!
//! - **Exactly once**: the failure path and the final success share one
//!   [`SettleGate`]; a bare decrement-to-zero check would let a concurrent
//!   failure and last success both settle `parent`.
//! - **Fail fast**: the first observed failure wins; later completions of
//!   either kind never alter `parent`.
//! - **Empty**: zero children resolve `parent` immediately.
//! - **No cancellation**: children keep running after a failure.
//! - **No cycles**: shared state holds child values, never child handles, so
//!   abandoning a pending child frees everything reachable from it.

use std::sync::{Arc, OnceLock};

use crate::error::Error;
use crate::promise::Promise;
use crate::sync::{Countdown, CountdownStep, SettleGate};
use crate::tracing_compat::{debug, trace};
use crate::types::Outcome;

use super::{parent_config, settle};

struct JoinState<R, F> {
    remaining: Countdown,
    gate: SettleGate,
    /// Called with a child's index and value before it counts down.
    record: R,
    finish: F,
}

/// Resolves `parent` once every child has succeeded; rejects it with the
/// first observed child failure.
///
/// # Example
/// ```
/// use settle::{combinator::all, Promise};
///
/// let parent = Promise::new();
/// let children: Vec<Promise<u32>> = vec![Promise::new(), Promise::new()];
/// all(&parent, &children);
///
/// children[1].resolve(2);
/// assert!(parent.is_pending());
/// children[0].resolve(1);
/// assert!(parent.is_success());
/// ```
pub fn all<T>(parent: &Promise<()>, children: &[Promise<T>])
where
    T: Send + Sync + 'static,
{
    register(parent, children, "all", |_, _| {}, || Outcome::Ok(()));
}

/// Like [`all`], but resolves `parent` with every child's value, ordered by
/// the child's position in `children`.
///
/// # Example
/// ```
/// use settle::{combinator::all_values, Promise};
///
/// let parent = Promise::new();
/// let children: Vec<Promise<&str>> = vec![Promise::new(), Promise::new()];
/// all_values(&parent, &children);
///
/// children[1].resolve("b");
/// children[0].resolve("a");
/// assert_eq!(parent.value(), Some(&vec!["a", "b"]));
/// ```
pub fn all_values<T>(parent: &Promise<Vec<T>>, children: &[Promise<T>])
where
    T: Clone + Send + Sync + 'static,
{
    let slots: Arc<[OnceLock<T>]> = children.iter().map(|_| OnceLock::new()).collect();
    let filled = Arc::clone(&slots);
    register(
        parent,
        children,
        "all_values",
        move |index, value: &T| {
            // Each child settles once, so each slot is written once.
            let _ = filled[index].set(value.clone());
        },
        move || {
            // Every slot was written before its child counted down, and the
            // countdown's acquire-release chain publishes all of them here.
            slots
                .iter()
                .map(|slot| slot.get().cloned())
                .collect::<Option<Vec<T>>>()
                .map_or_else(
                    || Outcome::Err(Error::internal("countdown finished with an empty slot")),
                    Outcome::Ok,
                )
        },
    );
}

/// Creates a parent promise and joins `children` into it with [`all`].
#[must_use]
pub fn join_all<T>(children: &[Promise<T>]) -> Promise<()>
where
    T: Send + Sync + 'static,
{
    let parent = Promise::with_config(&parent_config(children));
    all(&parent, children);
    parent
}

/// Creates a parent promise and joins `children` into it with
/// [`all_values`].
#[must_use]
pub fn join_all_values<T>(children: &[Promise<T>]) -> Promise<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let parent = Promise::with_config(&parent_config(children));
    all_values(&parent, children);
    parent
}

fn register<T, P, R, F>(
    parent: &Promise<P>,
    children: &[Promise<T>],
    kind: &'static str,
    record: R,
    finish: F,
) where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
    R: Fn(usize, &T) + Send + Sync + 'static,
    F: Fn() -> Outcome<P> + Send + Sync + 'static,
{
    trace!(
        parent = %parent.id(),
        combinator = kind,
        children = children.len(),
        "registering join listeners"
    );

    if children.is_empty() {
        settle(parent, finish(), kind);
        return;
    }

    let state = Arc::new(JoinState {
        remaining: Countdown::new(children.len()),
        gate: SettleGate::new(),
        record,
        finish,
    });

    for (index, child) in children.iter().enumerate() {
        if state.gate.is_closed() {
            // An already-settled child decided the parent during
            // registration; the rest cannot change it.
            trace!(
                parent = %parent.id(),
                combinator = kind,
                skipped = children.len() - index,
                "parent decided during registration"
            );
            break;
        }

        let state = Arc::clone(&state);
        let parent = parent.clone();
        child.on_complete(move |child| {
            if let Some(cause) = child.cause() {
                if state.gate.try_close() {
                    trace!(
                        parent = %parent.id(),
                        child = %child.id(),
                        index,
                        "child failed, rejecting parent"
                    );
                    settle(&parent, Outcome::Err(cause.clone()), kind);
                } else {
                    debug!(
                        parent = %parent.id(),
                        child = %child.id(),
                        "child failure ignored, parent already decided"
                    );
                }
                return;
            }

            if let Some(value) = child.value() {
                (state.record)(index, value);
            }
            match state.remaining.count_down() {
                CountdownStep::Reached => {
                    if state.gate.try_close() {
                        trace!(parent = %parent.id(), "all children succeeded");
                        settle(&parent, (state.finish)(), kind);
                    }
                }
                CountdownStep::Remaining(left) => {
                    trace!(parent = %parent.id(), index, left, "child succeeded");
                }
                CountdownStep::Exhausted => {
                    debug!(
                        parent = %parent.id(),
                        child = %child.id(),
                        "success after countdown finished"
                    );
                }
            }
        });
    }
}
