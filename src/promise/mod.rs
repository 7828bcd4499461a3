//! Single-assignment promises with completion listeners.
//!
//! A [`Promise`] starts pending and settles at most once, either with a value
//! or with an [`Error`] cause. Callers observe settlement by registering
//! completion listeners, by blocking in [`Promise::wait_timeout`], or by
//! awaiting [`Promise::settled`].
//!
//! # Listener Semantics
//!
//! - A listener runs exactly once, after settlement, and receives the
//!   settled promise.
//! - Listeners queued on a pending promise run on the thread that settles it,
//!   in registration order.
//! - A listener registered on an already-settled promise runs immediately on
//!   the registering thread.
//! - The queue lock is never held while listener code runs, so a listener may
//!   freely settle other promises or register more listeners.
//!
//! # Settlement
//!
//! [`resolve`](Promise::resolve) and [`reject`](Promise::reject) return
//! whether the call settled the promise; later calls are no-ops.
//! [`complete`](Promise::complete) is the strict form and reports
//! [`ErrorKind::AlreadySettled`](crate::ErrorKind::AlreadySettled).

mod settled;

pub use settled::Settled;

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::config::PromiseConfig;
use crate::error::{Error, Result};
use crate::tracing_compat::{debug, error, trace, warn};
use crate::types::{Outcome, PanicPayload};

/// Process-unique identifier of a promise, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseId(u64);

impl PromiseId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise-{}", self.0)
    }
}

type Listener<T> = Box<dyn FnOnce(&Promise<T>) + Send + 'static>;

enum Listeners<T> {
    Pending {
        queue: SmallVec<[Listener<T>; 2]>,
        warned: bool,
    },
    Settled,
}

struct Inner<T> {
    id: PromiseId,
    config: PromiseConfig,
    outcome: OnceLock<Outcome<T>>,
    listeners: Mutex<Listeners<T>>,
    settled: Condvar,
}

/// A handle to a single-assignment result cell.
///
/// Cloning the handle is cheap; all clones refer to the same cell.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Promise<T> {
    /// Creates a pending promise with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&PromiseConfig::default())
    }

    /// Creates a pending promise with the given configuration.
    #[must_use]
    pub fn with_config(config: &PromiseConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: PromiseId::next(),
                config: *config,
                outcome: OnceLock::new(),
                listeners: Mutex::new(Listeners::Pending {
                    queue: SmallVec::new(),
                    warned: false,
                }),
                settled: Condvar::new(),
            }),
        }
    }

    /// Creates a promise already settled with `value`.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    /// Creates a promise already settled with `cause`.
    #[must_use]
    pub fn rejected(cause: Error) -> Self {
        let promise = Self::new();
        promise.reject(cause);
        promise
    }

    /// Returns this promise's identifier.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.inner.id
    }

    /// Returns the configuration this promise was created with.
    #[must_use]
    pub fn config(&self) -> &PromiseConfig {
        &self.inner.config
    }

    /// Returns true if both handles refer to the same promise.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true while the promise has not settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.outcome.get().is_none()
    }

    /// Returns true if the promise settled with a value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.inner.outcome.get().is_some_and(Outcome::is_ok)
    }

    /// Returns true if the promise settled with a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.inner.outcome.get().is_some_and(Outcome::is_err)
    }

    /// Returns the settled outcome, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.inner.outcome.get()
    }

    /// Returns the success value, if the promise succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.outcome().and_then(Outcome::value)
    }

    /// Returns the failure cause, if the promise failed.
    #[must_use]
    pub fn cause(&self) -> Option<&Error> {
        self.outcome().and_then(Outcome::cause)
    }

    /// Settles the promise with a value.
    ///
    /// Returns `true` if this call settled the promise.
    pub fn resolve(&self, value: T) -> bool {
        self.complete(Outcome::Ok(value)).is_ok()
    }

    /// Settles the promise with a failure cause.
    ///
    /// Returns `true` if this call settled the promise.
    pub fn reject(&self, cause: Error) -> bool {
        self.complete(Outcome::Err(cause)).is_ok()
    }

    /// Settles the promise, running every queued listener.
    ///
    /// # Panics
    ///
    /// With [`catch_listener_panics`](PromiseConfig::catch_listener_panics)
    /// disabled, re-raises the first listener panic once every queued
    /// listener has run. The promise is settled either way.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadySettled`](crate::ErrorKind::AlreadySettled)
    /// if the promise was already settled. The earlier outcome is kept and no
    /// listener runs again.
    pub fn complete(&self, outcome: Outcome<T>) -> Result<()> {
        let success = outcome.is_ok();
        let mut guard = self.inner.listeners.lock();
        let queue = match &mut *guard {
            Listeners::Pending { queue, .. } => Some(std::mem::take(queue)),
            Listeners::Settled => None,
        };
        let Some(queue) = queue else {
            drop(guard);
            debug!(
                promise = %self.inner.id,
                "ignored settlement of an already-settled promise"
            );
            return Err(Error::already_settled());
        };

        // The outcome cell is only written under the listener lock while
        // pending, so this cannot already be set.
        if self.inner.outcome.set(outcome).is_err() {
            return Err(Error::internal("outcome set twice under listener lock"));
        }
        *guard = Listeners::Settled;
        drop(guard);
        self.inner.settled.notify_all();

        trace!(
            promise = %self.inner.id,
            success,
            listeners = queue.len(),
            "promise settled"
        );

        // A listener that panics must not starve the ones queued after it.
        let mut escaped = None;
        for listener in queue {
            if let Err(payload) = self.invoke(listener) {
                escaped.get_or_insert(payload);
            }
        }
        if let Some(payload) = escaped {
            panic::resume_unwind(payload);
        }
        Ok(())
    }

    /// Registers a listener that runs exactly once after settlement.
    ///
    /// If the promise is already settled the listener runs immediately on
    /// the calling thread.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from a listener run immediately when
    /// [`catch_listener_panics`](PromiseConfig::catch_listener_panics) is
    /// disabled.
    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let mut guard = self.inner.listeners.lock();
        if let Listeners::Pending { queue, warned } = &mut *guard {
            queue.push(Box::new(listener));
            let queued = queue.len();
            let crossed = !*warned && queued > self.inner.config.listener_warn_threshold;
            if crossed {
                *warned = true;
            }
            drop(guard);
            if crossed {
                warn!(
                    promise = %self.inner.id,
                    listeners = queued,
                    threshold = self.inner.config.listener_warn_threshold,
                    "listener queue exceeded threshold on a pending promise"
                );
            }
            return;
        }
        drop(guard);
        if let Err(payload) = self.invoke(Box::new(listener)) {
            panic::resume_unwind(payload);
        }
    }

    /// Registers a listener that runs only if the promise succeeds.
    pub fn on_success<F>(&self, f: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_complete(move |p| {
            if let Some(value) = p.value() {
                f(value);
            }
        });
    }

    /// Registers a listener that runs only if the promise fails.
    pub fn on_failure<F>(&self, f: F)
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.on_complete(move |p| {
            if let Some(cause) = p.cause() {
                f(cause);
            }
        });
    }

    /// Runs one listener. A panic is logged and swallowed, or handed back
    /// for the caller to re-raise when the configuration says so.
    fn invoke(&self, listener: Listener<T>) -> std::result::Result<(), Box<dyn Any + Send>> {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(self))) else {
            return Ok(());
        };
        let caught = PanicPayload::from_panic(&*payload);
        if self.inner.config.catch_listener_panics {
            error!(
                promise = %self.inner.id,
                panic = %caught,
                "completion listener panicked"
            );
            return Ok(());
        }
        debug!(
            promise = %self.inner.id,
            panic = %caught,
            "completion listener panicked, re-raising after the queue drains"
        );
        Err(payload)
    }
}

impl<T: Clone> Promise<T> {
    /// Blocks the calling thread until the promise settles.
    #[must_use]
    pub fn wait(&self) -> Outcome<T> {
        let mut guard = self.inner.listeners.lock();
        while matches!(*guard, Listeners::Pending { .. }) {
            self.inner.settled.wait(&mut guard);
        }
        drop(guard);
        match self.outcome() {
            Some(outcome) => outcome.clone(),
            None => Outcome::Err(Error::internal("woken without an outcome")),
        }
    }

    /// Blocks the calling thread until the promise settles or `timeout`
    /// elapses. Returns `None` on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };
        let mut guard = self.inner.listeners.lock();
        while matches!(*guard, Listeners::Pending { .. }) {
            if self.inner.settled.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        drop(guard);
        self.outcome().cloned()
    }

    /// Returns a future that completes with the outcome once the promise
    /// settles.
    #[must_use]
    pub fn settled(&self) -> Settled<T> {
        Settled::new(self.clone())
    }
}

impl<T> Promise<T>
where
    T: Send + Sync + 'static,
{
    /// Derives a promise holding `f(value)`; see [`crate::combinator::map`].
    pub fn map<U, F>(&self, f: F) -> Promise<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        crate::combinator::map(self, f)
    }

    /// Derives a promise from a fallible transform; see
    /// [`crate::combinator::try_map`].
    pub fn try_map<U, E, F>(&self, f: F) -> Promise<U>
    where
        U: Send + Sync + 'static,
        E: Into<Error>,
        F: FnOnce(&T) -> std::result::Result<U, E> + Send + 'static,
    {
        crate::combinator::try_map(self, f)
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.inner.id)
            .field("outcome", &self.inner.outcome.get())
            .finish()
    }
}
