//! Error types for shared memory operations

use rtlink_common::error::ErrorKind;
use thiserror::Error;

/// Errors that can occur during shared memory operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment name violates the naming rules
    #[error("Malformed segment name '{name}': {reason}")]
    MalformedName {
        /// Offending name
        name: String,
        /// Rule that was violated
        reason: &'static str,
    },

    /// Segment already registered in this process
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment not found
    #[error("memory segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Argument rejected before touching the OS
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected
        reason: String,
    },

    /// Payload smaller than the requested type
    #[error("Payload of '{name}' is {actual} bytes, {required} required")]
    PayloadTooSmall {
        /// Segment name
        name: String,
        /// Bytes the caller needs
        required: usize,
        /// Bytes the segment holds
        actual: usize,
    },

    /// Mapped object does not start with a segment header
    #[error("Segment '{name}' has no valid header")]
    InvalidHeader {
        /// Segment name
        name: String,
    },

    /// Stored record could not be decoded
    #[error("Failed to decode '{record}': {reason}")]
    Decode {
        /// Raw record
        record: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Deadline passed before the operation completed
    #[error("Deadline exceeded: {operation}")]
    DeadlineExceeded {
        /// Operation that timed out
        operation: &'static str,
    },

    /// OS call creating, mapping or removing a segment failed
    #[error("{operation} failed for '{name}': {source}")]
    Allocation {
        /// Segment name
        name: String,
        /// Failing OS call
        operation: &'static str,
        /// Source nix error
        #[source]
        source: nix::Error,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

impl ShmError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedName { .. } => ErrorKind::MalformedName,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument { .. } | Self::PayloadTooSmall { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::InvalidHeader { .. } | Self::Decode { .. } => ErrorKind::Decode,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Allocation { .. } | Self::Io { .. } | Self::Nix { .. } => ErrorKind::Allocation,
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
