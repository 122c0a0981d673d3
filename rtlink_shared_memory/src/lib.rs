//! # rtlink Shared Memory
//!
//! Named POSIX shared memory segments exchanged between co-located processes:
//! a real-time control process and one or more hardware modules. Producers and
//! consumers are built independently, so every segment carries an explicit type
//! tag and every typed access goes through one validated view boundary.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────┬─────────────────────────┐
//! │ SegmentHeader (128 B)    │ Payload (size_of::<T>())│
//! │ magic | size | attach    │                         │
//! │ must_be_used | type tag  │                         │
//! └──────────────────────────┴─────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rtlink_shared_memory::{ReadOnlySegment, SegmentName, SharedMemoryManager};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Producer
//! let manager = SharedMemoryManager::new();
//! let name = SegmentName::new("", "gripper", "opening_mm")?;
//! manager.add_segment(&name, true, 12.5f64)?;
//!
//! // Consumer, usually in another process
//! let view = ReadOnlySegment::<f64>::attach(&name)?;
//! assert_eq!(view.read(), 12.5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`name`] - Segment naming and decoding
//! - [`header`] - Fixed segment header
//! - [`directory`] - Module directory with a required subset
//! - [`manager`] - Per-process registry that creates and unlinks segments
//! - [`segment`] - Read-only and read-write typed views
//! - [`futex`] - Cross-process wait/signal counter
//! - [`platform`] - POSIX shm and futex syscalls
//!
//! ## Thread Safety
//!
//! - **SharedMemoryManager**: Thread-safe, one mutex around registration and lookup
//! - **ReadOnlySegment / ReadWriteSegment**: `Send`, single owner per view
//! - **BinaryFutex**: Lock-free, safe across threads and processes

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod error;
pub mod futex;
pub mod header;
pub mod manager;
pub mod name;
pub mod payload;
pub mod platform;
pub mod segment;

pub use directory::{DirectoryEntry, SegmentDirectory};
pub use error::{ShmError, ShmResult};
pub use futex::BinaryFutex;
pub use header::{HEADER_SIZE, SEGMENT_MAGIC, SegmentHeader};
pub use manager::{BYTE_SEGMENT_TYPE_TAG, SharedMemoryManager};
pub use name::{SegmentName, interface_name_from_segment_name};
pub use payload::ShmPayload;
pub use segment::{ReadOnlySegment, ReadWriteSegment, SegmentInfo, inspect};

/// Initialize tracing for library users and tests
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
