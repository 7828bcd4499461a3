//! Any combinator: the first child to settle decides the parent.
//!
//! The winning child's outcome is propagated as-is: a success value resolves
//! the parent, a failure cause rejects it. Every later completion, of either
//! kind, is ignored. One [`SettleGate`] is tested before acting on any
//! completion, so exactly one child ever settles the parent.
//!
//! A first-wins combinator over no children has no winner; the parent is
//! rejected with [`ErrorKind::NoChildren`](crate::ErrorKind::NoChildren)
//! rather than left pending forever.

use std::sync::Arc;

use crate::error::Error;
use crate::promise::Promise;
use crate::sync::SettleGate;
use crate::tracing_compat::{debug, trace};
use crate::types::Outcome;

use super::{parent_config, settle};

/// Settles `parent` with the outcome of whichever child settles first.
///
/// # Example
/// ```
/// use settle::{combinator::any, Error, Promise};
///
/// let parent = Promise::new();
/// let children: Vec<Promise<&str>> = vec![Promise::new(), Promise::new()];
/// any(&parent, &children);
///
/// children[1].resolve("x");
/// children[0].reject(Error::user("boom"));
/// assert_eq!(parent.value(), Some(&"x"));
/// ```
pub fn any<T>(parent: &Promise<T>, children: &[Promise<T>])
where
    T: Clone + Send + Sync + 'static,
{
    trace!(
        parent = %parent.id(),
        children = children.len(),
        "registering any listeners"
    );

    if children.is_empty() {
        settle(parent, Outcome::Err(Error::no_children()), "any");
        return;
    }

    let gate = Arc::new(SettleGate::new());
    for (index, child) in children.iter().enumerate() {
        if gate.is_closed() {
            break;
        }

        let gate = Arc::clone(&gate);
        let parent = parent.clone();
        child.on_complete(move |child| {
            if !gate.try_close() {
                debug!(
                    parent = %parent.id(),
                    child = %child.id(),
                    "completion ignored, parent already decided"
                );
                return;
            }
            trace!(
                parent = %parent.id(),
                child = %child.id(),
                index,
                success = child.is_success(),
                "first child settled"
            );
            let outcome = child.outcome().cloned().unwrap_or_else(|| {
                Outcome::Err(Error::internal("completion listener ran on a pending promise"))
            });
            settle(&parent, outcome, "any");
        });
    }
}

/// Creates a parent promise and races `children` into it with [`any`].
#[must_use]
pub fn race<T>(children: &[Promise<T>]) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    let parent = Promise::with_config(&parent_config(children));
    any(&parent, children);
    parent
}
