//! Shared helpers for the integration test suites.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use settle::{Error, Promise};

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_proptest_config(cases: u32) -> proptest::test_runner::Config {
    proptest::test_runner::Config {
        cases,
        failure_persistence: None,
        ..proptest::test_runner::Config::default()
    }
}

/// Phase tracking macro for structured test logging.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(test = $name, "=== TEST START ===");
    };
}

/// Assertion with logging for better test output.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        if !$cond {
            tracing::error!(
                message = $msg,
                expected = ?$expected,
                actual = ?$actual,
                "Assertion failed"
            );
        }
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// How a child promise should settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Succeed(u32),
    Fail(String),
}

impl Plan {
    pub fn apply(&self, promise: &Promise<u32>) -> bool {
        match self {
            Self::Succeed(v) => promise.resolve(*v),
            Self::Fail(msg) => promise.reject(Error::user(msg.clone())),
        }
    }
}

/// Counts how many times a promise's completion listener fires.
pub fn settlement_counter<T>(promise: &Promise<T>) -> Arc<AtomicUsize>
where
    T: Send + Sync + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    promise.on_complete(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    calls
}

/// Settles each child on its own thread, releasing all threads at once.
pub fn settle_concurrently(children: &[Promise<u32>], plans: &[Plan]) {
    assert_eq!(children.len(), plans.len());
    let barrier = Arc::new(Barrier::new(children.len()));
    let handles: Vec<_> = children
        .iter()
        .cloned()
        .zip(plans.iter().cloned())
        .map(|(child, plan)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                plan.apply(&child);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("settler thread panicked");
    }
}
