//! Error classification shared by every rtlink crate.
//!
//! Each crate defines its own `thiserror` enum; all of them map onto
//! [`ErrorKind`] so callers can branch on the failure class without matching
//! crate-specific variants. Wrapping one error in another preserves its kind.

use std::fmt;

/// Failure class of an rtlink error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A segment name violates the naming rules.
    MalformedName,
    /// A segment exists but carries a different type tag.
    TypeMismatch,
    /// The object is already registered or a request is already in flight.
    AlreadyExists,
    /// The named object does not exist.
    NotFound,
    /// The operation is not valid in the object's current state.
    FailedPrecondition,
    /// The deadline passed before the operation completed.
    DeadlineExceeded,
    /// An argument was rejected.
    InvalidArgument,
    /// An OS resource could not be created, mapped or signalled.
    Allocation,
    /// Stored data could not be decoded.
    Decode,
}

impl ErrorKind {
    /// Stable lowercase identifier, used in logs and JSON output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedName => "malformed_name",
            Self::TypeMismatch => "type_mismatch",
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::FailedPrecondition => "failed_precondition",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::InvalidArgument => "invalid_argument",
            Self::Allocation => "allocation",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
