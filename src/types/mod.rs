//! Core types for settle.
//!
//! - [`outcome`]: Two-valued settled state of a promise

pub mod outcome;

pub use outcome::{Outcome, PanicPayload};
