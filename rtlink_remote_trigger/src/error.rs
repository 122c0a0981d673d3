//! Error types for the remote trigger protocol.

use rtlink_common::error::ErrorKind;
use rtlink_common::thread::ThreadError;
use rtlink_shared_memory::ShmError;
use thiserror::Error;

/// Errors returned by trigger clients and servers.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The client has not attached the server's primitives.
    #[error("client not connected to '{server}'")]
    NotConnected {
        /// Server base name.
        server: String,
    },

    /// The deadline had already passed when the call was made.
    #[error("deadline already exceeded before triggering '{server}'")]
    DeadlineExceeded {
        /// Server base name.
        server: String,
    },

    /// Another request from this client is still outstanding.
    #[error("request already triggered on '{server}'")]
    AlreadyTriggered {
        /// Server base name.
        server: String,
    },

    /// The async request was already completed.
    #[error("async request no longer valid")]
    RequestNoLongerValid,

    /// Shared memory failure; keeps its kind (a timed out wait stays
    /// `DeadlineExceeded`).
    #[error(transparent)]
    Shm {
        /// Source shared memory error.
        #[from]
        source: ShmError,
    },

    /// Server thread failure.
    #[error(transparent)]
    Thread {
        /// Source thread error.
        #[from]
        source: ThreadError,
    },
}

impl TriggerError {
    /// Failure class of this error. Wrapped errors report their own kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected { .. } => ErrorKind::InvalidArgument,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::AlreadyTriggered { .. } => ErrorKind::AlreadyExists,
            Self::RequestNoLongerValid => ErrorKind::FailedPrecondition,
            Self::Shm { source } => source.kind(),
            Self::Thread { source } => source.kind(),
        }
    }
}

/// Result type for trigger operations.
pub type TriggerResult<T> = Result<T, TriggerError>;
