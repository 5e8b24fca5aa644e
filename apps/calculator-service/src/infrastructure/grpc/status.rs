//! Status Mapping
//!
//! Conversions between [`CallError`] and `tonic::Status`. Outgoing statuses
//! carry `google.rpc` error details: an `ErrorInfo` naming the failure kind
//! and, for rejected input, a `BadRequest` field violation.

use std::collections::HashMap;

use tonic::{Code, Status};
use tonic_types::{ErrorDetails, StatusExt};

use crate::domain::session::{CallError, ErrorKind};

/// Error domain reported in `ErrorInfo`.
pub const ERROR_DOMAIN: &str = "calculator.v1";

/// gRPC status code for a failure kind.
#[must_use]
pub const fn grpc_code(kind: ErrorKind) -> Code {
    match kind {
        ErrorKind::InvalidArgument => Code::InvalidArgument,
        ErrorKind::Cancelled => Code::Cancelled,
        ErrorKind::DeadlineExceeded => Code::DeadlineExceeded,
        ErrorKind::Unknown => Code::Unknown,
    }
}

/// Machine-readable reason reported in `ErrorInfo`.
#[must_use]
pub const fn reason(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
        ErrorKind::Cancelled => "CANCELLED",
        ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
        ErrorKind::Unknown => "UNKNOWN",
    }
}

/// Convert a call error into a status with error details.
#[must_use]
pub fn to_status(err: &CallError) -> Status {
    to_status_with_field(err, "request")
}

/// Convert a call error into a status, attributing an invalid argument to
/// `field`.
#[must_use]
pub fn to_status_with_field(err: &CallError, field: &str) -> Status {
    let mut details = ErrorDetails::new();
    details.set_error_info(reason(err.kind()), ERROR_DOMAIN, HashMap::new());

    if err.kind() == ErrorKind::InvalidArgument {
        details.add_bad_request_violation(field, err.message());
    }

    Status::with_error_details(grpc_code(err.kind()), err.message(), details)
}

/// Classify a received status. Codes other than the three named kinds
/// collapse to [`ErrorKind::Unknown`], keeping the original code in the
/// message.
#[must_use]
pub fn from_status(status: &Status) -> CallError {
    match status.code() {
        Code::InvalidArgument => CallError::invalid_argument(status.message()),
        Code::Cancelled => CallError::cancelled(status.message()),
        Code::DeadlineExceeded => CallError::deadline_exceeded(status.message()),
        code => CallError::unknown(format!("{code:?}: {}", status.message())),
    }
}

/// Field violations (`field`, `description`) attached to a status.
#[must_use]
pub fn field_violations(status: &Status) -> Vec<(String, String)> {
    status
        .get_details_bad_request()
        .map(|bad_request| {
            bad_request
                .field_violations
                .into_iter()
                .map(|v| (v.field, v.description))
                .collect()
        })
        .unwrap_or_default()
}

impl From<CallError> for Status {
    fn from(err: CallError) -> Self {
        to_status(&err)
    }
}

impl From<Status> for CallError {
    fn from(status: Status) -> Self {
        from_status(&status)
    }
}
