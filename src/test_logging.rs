//! Settlement recorder for tests.
//!
//! [`TestLogger`] watches promises and records each settlement it observes,
//! so a test can assert the exactly-once law directly and print a readable
//! timeline when an assertion fails.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use settle::test_logging::{TestLogLevel, TestLogger};
//! use settle::Promise;
//!
//! let logger = Arc::new(TestLogger::new(TestLogLevel::Debug));
//! let promise: Promise<u32> = Promise::new();
//! logger.watch(&promise);
//!
//! promise.resolve(7);
//! logger.assert_settled_once(promise.id().get());
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::promise::Promise;

/// Verbosity of a [`TestLogger`], least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TestLogLevel {
    /// Errors only.
    Error,
    /// Warnings and above.
    Warn,
    /// Combinator invocations.
    #[default]
    Info,
    /// Settlements.
    Debug,
    /// Listener registration.
    Trace,
}

impl TestLogLevel {
    const fn tag(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }
}

/// Something a test observed.
#[derive(Debug, Clone)]
pub enum TestEvent {
    /// A combinator was invoked.
    CombinatorStart {
        /// Combinator name.
        kind: &'static str,
        /// Number of children.
        children: usize,
    },
    /// A watcher was attached to a promise.
    ListenerRegistered {
        /// Promise identifier.
        promise: u64,
    },
    /// A watched promise settled.
    Settled {
        /// Promise identifier.
        promise: u64,
        /// Whether it settled with a value.
        success: bool,
    },
    /// A settlement attempt lost to an earlier one.
    SettleIgnored {
        /// Promise identifier.
        promise: u64,
    },
    /// Free-form note.
    Note {
        /// Short tag for the report.
        category: &'static str,
        /// Message.
        message: String,
    },
    /// Something the test considers a failure.
    Error {
        /// Short tag for the report.
        category: &'static str,
        /// Message.
        message: String,
    },
}

impl TestEvent {
    /// Minimum logger level that records this event.
    #[must_use]
    pub fn level(&self) -> TestLogLevel {
        match self {
            Self::Error { .. } => TestLogLevel::Error,
            Self::SettleIgnored { .. } => TestLogLevel::Warn,
            Self::CombinatorStart { .. } => TestLogLevel::Info,
            Self::Settled { .. } | Self::Note { .. } => TestLogLevel::Debug,
            Self::ListenerRegistered { .. } => TestLogLevel::Trace,
        }
    }
}

impl std::fmt::Display for TestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CombinatorStart { kind, children } => write!(f, "{kind} over {children} children"),
            Self::ListenerRegistered { promise } => write!(f, "watching promise-{promise}"),
            Self::Settled { promise, success } => {
                let how = if *success { "ok" } else { "err" };
                write!(f, "promise-{promise} settled {how}")
            }
            Self::SettleIgnored { promise } => write!(f, "promise-{promise} late settle ignored"),
            Self::Note { category, message } | Self::Error { category, message } => {
                write!(f, "[{category}] {message}")
            }
        }
    }
}

#[derive(Debug)]
struct Record {
    elapsed: Duration,
    event: TestEvent,
}

/// Records promise activity with timestamps.
///
/// Share it through an `Arc`: watchers run on whichever thread settles the
/// promise.
#[derive(Debug)]
pub struct TestLogger {
    level: TestLogLevel,
    start: Instant,
    records: Mutex<Vec<Record>>,
}

impl TestLogger {
    /// Creates a logger recording events at `level` and below.
    #[must_use]
    pub fn new(level: TestLogLevel) -> Self {
        Self {
            level,
            start: Instant::now(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Records `event` if the level allows it.
    pub fn log(&self, event: TestEvent) {
        if event.level() > self.level {
            return;
        }
        let elapsed = self.start.elapsed();
        self.records.lock().push(Record { elapsed, event });
    }

    /// Records a free-form note.
    pub fn note(&self, category: &'static str, message: impl Into<String>) {
        self.log(TestEvent::Note {
            category,
            message: message.into(),
        });
    }

    /// Records a failure.
    pub fn error(&self, category: &'static str, message: impl Into<String>) {
        self.log(TestEvent::Error {
            category,
            message: message.into(),
        });
    }

    /// Attaches a listener to `promise` that records its settlement.
    pub fn watch<T>(self: &Arc<Self>, promise: &Promise<T>)
    where
        T: Send + Sync + 'static,
    {
        let id = promise.id().get();
        self.log(TestEvent::ListenerRegistered { promise: id });
        let logger = Arc::clone(self);
        promise.on_complete(move |settled| {
            logger.log(TestEvent::Settled {
                promise: id,
                success: settled.is_success(),
            });
        });
    }

    /// Records the result of a `resolve`/`reject` call; losing calls are
    /// logged as ignored.
    pub fn record_settle(&self, promise: u64, applied: bool) {
        if !applied {
            self.log(TestEvent::SettleIgnored { promise });
        }
    }

    /// Number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.records.lock().len()
    }

    /// How many times `promise` was seen settling.
    #[must_use]
    pub fn settle_count(&self, promise: u64) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| matches!(r.event, TestEvent::Settled { promise: p, .. } if p == promise))
            .count()
    }

    /// Timeline followed by a per-promise settlement tally.
    #[must_use]
    pub fn report(&self) -> String {
        let records = self.records.lock();
        let mut tally: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
        let mut out = String::new();

        let _ = writeln!(out, "--- settle timeline ({} events) ---", records.len());
        for record in records.iter() {
            let _ = writeln!(
                out,
                "{:>9.3}ms {:<5} {}",
                record.elapsed.as_secs_f64() * 1000.0,
                record.event.level().tag(),
                record.event
            );
            match record.event {
                TestEvent::Settled { promise, .. } => tally.entry(promise).or_default().0 += 1,
                TestEvent::SettleIgnored { promise } => tally.entry(promise).or_default().1 += 1,
                _ => {}
            }
        }

        let _ = writeln!(out, "--- settlements per promise ---");
        for (promise, (settled, ignored)) in &tally {
            let _ = writeln!(out, "promise-{promise}: settled={settled} ignored={ignored}");
        }
        out
    }

    /// Asserts `promise` was seen settling exactly once.
    ///
    /// # Panics
    ///
    /// Panics with the report if it settled zero or several times.
    pub fn assert_settled_once(&self, promise: u64) {
        let count = self.settle_count(promise);
        assert!(
            count == 1,
            "promise-{promise} settled {count} times, expected exactly once\n{}",
            self.report()
        );
    }

    /// Asserts no [`TestEvent::Error`] was recorded.
    ///
    /// # Panics
    ///
    /// Panics with the report if one was.
    pub fn assert_no_errors(&self) {
        let errors: Vec<String> = self
            .records
            .lock()
            .iter()
            .filter(|r| matches!(r.event, TestEvent::Error { .. }))
            .map(|r| r.event.to_string())
            .collect();
        assert!(
            errors.is_empty(),
            "{} error(s) recorded: {}\n{}",
            errors.len(),
            errors.join("; "),
            self.report()
        );
    }
}

/// Records a formatted note on a [`TestLogger`].
///
/// ```ignore
/// test_log!(logger, "setup", "spawning {} settlers", n);
/// ```
#[macro_export]
macro_rules! test_log {
    ($logger:expr, $cat:literal, $($arg:tt)*) => {
        $logger.note($cat, format!($($arg)*))
    };
}

/// Asserts equality, printing the logger's report on failure.
///
/// ```ignore
/// assert_eq_log!(logger, calls, 1);
/// ```
#[macro_export]
macro_rules! assert_eq_log {
    ($logger:expr, $left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    panic!(
                        "assertion failed: left == right\n  left: {:?}\n right: {:?}\n{}",
                        left,
                        right,
                        $logger.report()
                    );
                }
            }
        }
    };
}
