//! Logging shim over the `tracing` crate.
//!
//! With the `tracing-integration` feature the macros re-exported here are the
//! `tracing` macros. Without it they only borrow their field values, so the
//! library has no logging dependency, call sites stay unchanged, and
//! bindings used solely for logging still count as used.

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, error, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
pub(crate) mod noop {
    /// Accepts the `tracing` field syntax used in this crate
    /// (`name = %value`, `name = ?value`, `name = value`, `name`, then a
    /// message literal with format arguments) and evaluates nothing but
    /// borrows of the values.
    macro_rules! noop_log {
        () => {};
        ($name:ident = %$value:expr $(, $($rest:tt)*)?) => {{
            let _ = &$value;
            $crate::tracing_compat::noop::noop_log!($($($rest)*)?);
        }};
        ($name:ident = ?$value:expr $(, $($rest:tt)*)?) => {{
            let _ = &$value;
            $crate::tracing_compat::noop::noop_log!($($($rest)*)?);
        }};
        ($name:ident = $value:expr $(, $($rest:tt)*)?) => {{
            let _ = &$value;
            $crate::tracing_compat::noop::noop_log!($($($rest)*)?);
        }};
        ($name:ident $(, $($rest:tt)*)?) => {{
            let _ = &$name;
            $crate::tracing_compat::noop::noop_log!($($($rest)*)?);
        }};
        ($msg:literal $(, $arg:expr)* $(,)?) => {{
            let _ = ($(&$arg,)*);
        }};
    }

    pub(crate) use noop_log;
    pub(crate) use noop_log as debug;
    pub(crate) use noop_log as error;
    pub(crate) use noop_log as trace;
    pub(crate) use noop_log as warn;
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop::{debug, error, trace, warn};
