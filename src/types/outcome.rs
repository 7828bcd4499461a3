//! Settled state of a promise.
//!
//! A promise is either pending or settled with an [`Outcome`]. Unlike
//! `Result`, an `Outcome` always carries the crate's shared [`Error`] as its
//! failure cause so causes can be forwarded between promises untouched.

use core::fmt;
use std::any::Any;

use crate::error::Error;

/// The terminal state of a settled promise.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Settled with a value.
    Ok(T),
    /// Settled with a failure cause.
    Err(Error),
}

impl<T> Outcome<T> {
    /// Creates a successful outcome.
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self::Ok(value)
    }

    /// Creates a failed outcome.
    #[must_use]
    pub const fn err(cause: Error) -> Self {
        Self::Err(cause)
    }

    /// Returns true if this is a success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this is a failure.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Returns the success value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            Self::Err(_) => None,
        }
    }

    /// Returns the failure cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&Error> {
        match self {
            Self::Ok(_) => None,
            Self::Err(e) => Some(e),
        }
    }

    /// Maps the success value, leaving a failure untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

/// Payload captured from a caught panic.
///
/// Only the message survives; the original `Box<dyn Any>` is not `Sync`
/// and cannot be shared between listeners.
#[derive(Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a payload from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts the message from a value returned by `catch_unwind`.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { message }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicPayload").field(&self.message).finish()
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
