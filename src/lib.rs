//! Lock-free promise combinators.
//!
//! A [`Promise`] is a single-assignment result cell: it starts pending and
//! settles once, with a value or with an [`Error`]. The combinators compose
//! independently settling promises into one:
//!
//! - [`all`](combinator::all): wait for every child, fail fast on the first failure
//! - [`any`](combinator::any): the first child to settle decides
//! - [`map`](combinator::map): transform a success, pass a failure through
//!
//! Combinators only register completion listeners and return; they never
//! block. Listeners run on whichever thread settles a child, and the only
//! state they share is a per-invocation atomic gate (plus a countdown for
//! `all`), so the derived promise settles exactly once under any
//! interleaving.
//!
//! # Example
//!
//! ```
//! use settle::{combinator, Error, Promise};
//!
//! let a: Promise<u32> = Promise::new();
//! let b: Promise<u32> = Promise::new();
//!
//! let both = combinator::join_all_values(&[a.clone(), b.clone()]);
//! let total = both.map(|values| values.iter().sum::<u32>());
//!
//! b.resolve(2);
//! a.resolve(40);
//! assert_eq!(total.value(), Some(&42));
//!
//! let first = combinator::race(&[Promise::new(), Promise::rejected(Error::user("down"))]);
//! assert!(first.is_failure());
//! # let _: &Promise<u8> = &first;
//! ```
//!
//! # Features
//!
//! - `tracing-integration` (default): emit log records through `tracing`

pub mod combinator;
pub mod config;
pub mod error;
pub mod promise;
pub mod sync;
pub mod test_logging;
pub mod types;

mod tracing_compat;

pub use combinator::{all, all_values, any, join_all, join_all_values, map, race, try_map};
pub use config::{ConfigError, ConfigLoader, PromiseConfig};
pub use error::{Error, ErrorCategory, ErrorKind, Recoverability, Result};
pub use promise::{Promise, PromiseId, Settled};
pub use types::{Outcome, PanicPayload};
