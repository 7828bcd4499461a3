//! Map combinator: transform a successful value.
//!
//! `map(source, f)` returns a derived promise synchronously and registers a
//! single listener on `source`:
//!
//! - `source` succeeds with `v`: the derived promise settles with `f(v)`
//! - `source` fails with `c`: the derived promise fails with `c`; `f` never runs
//! - `f` returns an error or panics: the derived promise fails with it
//!
//! The derived promise inherits the source's configuration. A transform
//! panic always rejects the derived promise first; with
//! `catch_transform_panics` disabled it is then re-raised into the source's
//! listener handling.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::Error;
use crate::promise::Promise;
use crate::tracing_compat::{trace, warn};
use crate::types::{Outcome, PanicPayload};

use super::settle;

/// Derives a promise that resolves with `transform(value)` when `source`
/// resolves, and fails with `source`'s cause otherwise.
///
/// A panic inside `transform` rejects the derived promise with
/// [`ErrorKind::TransformPanicked`](crate::ErrorKind::TransformPanicked).
/// If the source's configuration disables
/// [`catch_transform_panics`](crate::PromiseConfig::catch_transform_panics)
/// the panic is re-raised after the rejection.
///
/// # Example
/// ```
/// use settle::{combinator::map, Promise};
///
/// let source = Promise::new();
/// let doubled = map(&source, |x: &i32| x * 2);
/// source.resolve(3);
/// assert_eq!(doubled.value(), Some(&6));
/// ```
pub fn map<T, U, F>(source: &Promise<T>, transform: F) -> Promise<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: FnOnce(&T) -> U + Send + 'static,
{
    try_map(source, move |value| Ok::<U, Error>(transform(value)))
}

/// Derives a promise from a fallible transform.
///
/// An `Err(e)` returned by `transform` rejects the derived promise with
/// `e.into()`; an [`Error`] passes through unchanged.
///
/// # Example
/// ```
/// use settle::{combinator::try_map, Error, ErrorKind, Promise};
///
/// let source = Promise::new();
/// let parsed = try_map(&source, |s: &String| {
///     s.parse::<u16>().map_err(Error::transform)
/// });
/// source.resolve("not a number".to_string());
/// assert_eq!(parsed.cause().map(Error::kind), Some(ErrorKind::TransformFailed));
/// ```
pub fn try_map<T, U, E, F>(source: &Promise<T>, transform: F) -> Promise<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    E: Into<Error>,
    F: FnOnce(&T) -> Result<U, E> + Send + 'static,
{
    let derived = Promise::with_config(source.config());
    let target = derived.clone();
    let catch_panics = source.config().catch_transform_panics;

    trace!(
        source = %source.id(),
        derived = %derived.id(),
        "registering map listener"
    );

    source.on_complete(move |source| {
        let (outcome, escaped) = match source.outcome() {
            Some(Outcome::Ok(value)) => apply(transform, value),
            Some(Outcome::Err(cause)) => (Outcome::Err(cause.clone()), None),
            None => (
                Outcome::Err(Error::internal(
                    "completion listener ran on a pending promise",
                )),
                None,
            ),
        };
        trace!(
            source = %source.id(),
            derived = %target.id(),
            success = outcome.is_ok(),
            "map settled"
        );
        settle(&target, outcome, "map");

        if let Some(payload) = escaped {
            if !catch_panics {
                panic::resume_unwind(payload);
            }
        }
    });

    derived
}

type Escaped = Option<Box<dyn Any + Send>>;

/// Runs the transform, turning a panic into a rejection and handing the
/// raw payload back in case it must be re-raised.
fn apply<T, U, E, F>(transform: F, value: &T) -> (Outcome<U>, Escaped)
where
    E: Into<Error>,
    F: FnOnce(&T) -> Result<U, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| transform(value))) {
        Ok(Ok(mapped)) => (Outcome::Ok(mapped), None),
        Ok(Err(err)) => (Outcome::Err(err.into()), None),
        Err(payload) => {
            let caught = PanicPayload::from_panic(&*payload);
            warn!(panic = %caught, "map transform panicked");
            (Outcome::Err(Error::panicked(&caught)), Some(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromiseConfig;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn map_success() {
        let source = Promise::new();
        let derived = map(&source, |x: &i32| x * 2);
        assert!(derived.is_pending());
        source.resolve(3);
        assert_eq!(derived.value(), Some(&6));
    }

    #[test]
    fn map_on_settled_source_is_immediate() {
        let source = Promise::resolved(String::from("abc"));
        let derived = source.map(String::len);
        assert_eq!(derived.value(), Some(&3));
    }

    #[test]
    fn failure_passes_through_without_calling_transform() {
        let called = Arc::new(AtomicBool::new(false));
        let c = Arc::clone(&called);
        let source: Promise<i32> = Promise::new();
        let derived = map(&source, move |x| {
            c.store(true, Ordering::SeqCst);
            *x
        });

        let cause = Error::user("upstream");
        source.reject(cause);
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(derived.cause().and_then(Error::message), Some("upstream"));
    }

    #[test]
    fn transform_error_rejects_unchanged() {
        let source = Promise::new();
        let derived = try_map(&source, |_: &i32| -> Result<i32, Error> {
            Err(Error::user("bad input"))
        });
        source.resolve(1);
        let cause = derived.cause().unwrap();
        assert_eq!(cause.kind(), ErrorKind::User);
        assert_eq!(cause.message(), Some("bad input"));
    }

    #[test]
    fn transform_panic_rejects() {
        let source = Promise::new();
        let derived = map(&source, |_: &i32| -> i32 { panic!("transform bug") });
        source.resolve(1);
        let cause = derived.cause().unwrap();
        assert_eq!(cause.kind(), ErrorKind::TransformPanicked);
        assert_eq!(cause.message(), Some("transform bug"));
    }

    #[test]
    fn reraised_transform_panic_still_rejects_derived() {
        let config = PromiseConfig::new().catch_transform_panics(false);
        let source = Promise::with_config(&config);
        let derived = map(&source, |_: &i32| -> i32 { panic!("escapes") });
        // The re-raised panic is isolated by the source's listener handling.
        source.resolve(1);
        assert_eq!(
            derived.cause().map(Error::kind),
            Some(ErrorKind::TransformPanicked)
        );
        assert!(!derived.config().catch_transform_panics);
    }

    #[test]
    fn reraised_transform_panic_reaches_settling_thread() {
        let config = PromiseConfig::new()
            .catch_transform_panics(false)
            .catch_listener_panics(false);
        let source = Promise::with_config(&config);
        let derived = map(&source, |_: &i32| -> i32 { panic!("escapes") });
        let downstream = derived.map(|v| v + 1);

        let result = panic::catch_unwind(AssertUnwindSafe(|| source.resolve(1)));
        assert!(result.is_err());
        assert!(derived.is_failure());
        assert_eq!(
            downstream.cause().and_then(Error::message),
            Some("escapes")
        );
    }

    #[test]
    fn chained_maps() {
        let source = Promise::new();
        let out = source.map(|x: &u32| x + 1).map(|x| x * 10).map(u32::to_string);
        source.resolve(4);
        assert_eq!(out.value().map(String::as_str), Some("50"));
    }
}
