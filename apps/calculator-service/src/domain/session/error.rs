//! Call Errors
//!
//! Every failed call carries an [`ErrorKind`] that callers branch on and a
//! human-readable message that they never parse.

use std::fmt;

use thiserror::Error;

use crate::domain::operations::OperationError;

/// Failure category of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied a value that violates a precondition.
    InvalidArgument,
    /// The caller (or the server shutting down) aborted the call.
    Cancelled,
    /// The caller's deadline elapsed before the call completed.
    DeadlineExceeded,
    /// Transport or otherwise unclassified failure.
    Unknown,
}

impl ErrorKind {
    /// Stable lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error terminating a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CallError {
    kind: ErrorKind,
    message: String,
}

impl CallError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Precondition violated by a caller-supplied value.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Call aborted by cancellation.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Call aborted because its deadline elapsed.
    #[must_use]
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeadlineExceeded, message)
    }

    /// Transport or unclassified failure.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// The failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error aborted the call before it could finish
    /// (cancellation or deadline).
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Cancelled | ErrorKind::DeadlineExceeded
        )
    }
}

impl From<OperationError> for CallError {
    fn from(err: OperationError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}
