//! Future adapter over a promise's completion listener.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::Promise;
use crate::types::Outcome;

/// Future returned by [`Promise::settled`].
///
/// The first pending poll registers one completion listener that wakes the
/// most recently stored waker. Later polls only refresh the stored waker, so
/// repeated polling never grows the promise's listener queue.
pub struct Settled<T> {
    promise: Promise<T>,
    waker: Option<Arc<Mutex<Option<Waker>>>>,
}

impl<T> Settled<T> {
    pub(super) fn new(promise: Promise<T>) -> Self {
        Self {
            promise,
            waker: None,
        }
    }
}

impl<T> Future for Settled<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if let Some(outcome) = this.promise.outcome() {
            return Poll::Ready(outcome.clone());
        }

        if let Some(slot) = &this.waker {
            *slot.lock() = Some(cx.waker().clone());
        } else {
            let slot = Arc::new(Mutex::new(Some(cx.waker().clone())));
            let listener_slot = Arc::clone(&slot);
            this.waker = Some(slot);
            this.promise.on_complete(move |_| {
                let waker = listener_slot.lock().take();
                if let Some(waker) = waker {
                    waker.wake();
                }
            });
        }

        // The outcome is stored before listeners run, so re-checking after
        // publishing the waker cannot miss a settlement.
        match this.promise.outcome() {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for Settled<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settled")
            .field("promise", &self.promise.id())
            .field("registered", &self.waker.is_some())
            .finish()
    }
}
