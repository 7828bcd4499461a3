//! Error types and error handling strategy for settle.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Errors are cheap to clone so one cause can reach every listener
//! - A child's failure cause is propagated unchanged, never re-wrapped
//! - Panics inside user transforms are isolated and converted to errors
//!
//! # Error Categories
//!
//! - **Failure**: A cause supplied by the producer of a promise
//! - **Transform**: A map transform returned an error or panicked
//! - **Settlement**: Misuse of the single-assignment contract
//! - **Configuration**: Invalid configuration values
//! - **Internal**: Library bugs and invalid states
//!
//! # Recovery Classification
//!
//! All errors can be classified by [`Recoverability`]:
//! - `Permanent`: Produced by this crate; settling again cannot help
//! - `Unknown`: Supplied by the caller, who alone knows whether to retry

use core::fmt;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::types::PanicPayload;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Failure ===
    /// Failure cause supplied through [`Promise::reject`](crate::Promise::reject).
    User,

    // === Transform ===
    /// A map transform returned an error.
    TransformFailed,
    /// A map transform panicked.
    TransformPanicked,

    // === Settlement ===
    /// Tried to settle an already-settled promise.
    AlreadySettled,
    /// A first-wins combinator was given no children to wait on.
    NoChildren,

    // === Configuration ===
    /// Configuration error (invalid env var, bad override).
    Config,

    // === Internal ===
    /// Internal error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::User => ErrorCategory::Failure,
            Self::TransformFailed | Self::TransformPanicked => ErrorCategory::Transform,
            Self::AlreadySettled | Self::NoChildren => ErrorCategory::Settlement,
            Self::Config => ErrorCategory::Configuration,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns the recoverability classification for this error kind.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        match self {
            Self::AlreadySettled
            | Self::NoChildren
            | Self::TransformPanicked
            | Self::Config
            | Self::Internal => Recoverability::Permanent,
            Self::User | Self::TransformFailed => Recoverability::Unknown,
        }
    }
}

/// Classification of error recoverability.
///
/// Retrying is outside this crate, so no kind is classified as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Permanent failure that will not succeed on retry.
    Permanent,
    /// Recoverability depends on context and cannot be determined
    /// from the error kind alone.
    Unknown,
}

impl Recoverability {
    /// Returns true if this error should never be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Producer-supplied failures.
    Failure,
    /// Map transform failures.
    Transform,
    /// Single-assignment contract violations.
    Settlement,
    /// Invalid configuration.
    Configuration,
    /// Internal errors.
    Internal,
}

/// The main error type for settle operations.
///
/// Cloning an `Error` shares its source chain, so a cause delivered to many
/// listeners (or forwarded through several combinators) is the same cause.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a producer-supplied failure with a message.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(msg)
    }

    /// Wraps an arbitrary error returned by a map transform.
    #[must_use]
    pub fn transform(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        let message = source.to_string();
        Self::new(ErrorKind::TransformFailed)
            .with_message(message)
            .with_source(source)
    }

    /// Creates an error for a transform that panicked.
    #[must_use]
    pub fn panicked(payload: &PanicPayload) -> Self {
        Self::new(ErrorKind::TransformPanicked).with_message(payload.message())
    }

    /// Creates an error for a second settlement attempt.
    #[must_use]
    pub fn already_settled() -> Self {
        Self::new(ErrorKind::AlreadySettled).with_message("promise is already settled")
    }

    /// Creates an error for a first-wins combinator with nothing to wait on.
    #[must_use]
    pub fn no_children() -> Self {
        Self::new(ErrorKind::NoChildren).with_message("no child promises to wait on")
    }

    /// Creates an internal error (library bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns the recoverability classification.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.kind.recoverability()
    }

    /// Returns true if this error came out of a map transform.
    #[must_use]
    pub const fn is_transform_error(&self) -> bool {
        matches!(self.kind.category(), ErrorCategory::Transform)
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if both errors share the same source allocation.
    ///
    /// Used to check that a cause was forwarded rather than rebuilt.
    #[must_use]
    pub fn shares_source_with(&self, other: &Self) -> bool {
        match (&self.source, &other.source) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        Self::new(ErrorKind::Config)
            .with_message(message)
            .with_source(err)
    }
}

/// A specialized Result type for settle operations.
pub type Result<T> = std::result::Result<T, Error>;
