//! Error types for hardware interface access.

use rtlink_common::config::ConfigError;
use rtlink_common::error::ErrorKind;
use rtlink_shared_memory::ShmError;
use thiserror::Error;

/// Errors from resolving or attaching hardware interfaces.
#[derive(Debug, Error)]
pub enum InterfaceError {
    /// The segment exists but holds a different payload type.
    #[error(
        "Type mismatch: Interface '{interface}' was requested with type '{expected}' but has type '{actual}'"
    )]
    TypeMismatch {
        /// Segment name of the interface.
        interface: String,
        /// Tag the caller asked for.
        expected: String,
        /// Tag stored in the segment header.
        actual: String,
    },

    /// Shared memory failure; keeps its kind.
    #[error(transparent)]
    Shm {
        /// Source shared memory error.
        #[from]
        source: ShmError,
    },

    /// Module configuration failure.
    #[error(transparent)]
    Config {
        /// Source configuration error.
        #[from]
        source: ConfigError,
    },
}

impl InterfaceError {
    /// Failure class of this error. Wrapped errors report their own kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Shm { source } => source.kind(),
            Self::Config { source } => source.kind(),
        }
    }
}

/// Result type for interface operations.
pub type InterfaceResult<T> = Result<T, InterfaceError>;
