//! # rtlink Remote Trigger
//!
//! Request/response triggers between processes, built from two
//! [`BinaryFutex`](rtlink_shared_memory::BinaryFutex) segments named
//! `<server>_req` and `<server>_resp`.
//!
//! ```text
//! client                         server
//!   trigger(deadline)
//!     claim request_started
//!     post  <server>_req  ─────►  wait <server>_req
//!                                 callback()
//!     wait  <server>_resp ◄─────  post <server>_resp
//!     release request_started
//! ```
//!
//! Latency-sensitive callers use [`RemoteTriggerClient::trigger_async`] and
//! poll [`AsyncRequest::ready`] instead of blocking a control cycle.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rtlink_remote_trigger::{RemoteTriggerClient, RemoteTriggerServer, TriggerServerOptions};
//! use rtlink_shared_memory::{SegmentName, SharedMemoryManager};
//! use std::time::{Duration, Instant};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SharedMemoryManager::new();
//! let name = SegmentName::new("", "gripper", "close")?;
//! let server = RemoteTriggerServer::create(&manager, name.clone(), || println!("closing"))?
//!     .start(&TriggerServerOptions::default())?;
//!
//! let client = RemoteTriggerClient::create(name, true)?;
//! client.trigger(Instant::now() + Duration::from_secs(1))?;
//! server.stop()?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod server;

pub use client::{AsyncRequest, RemoteTriggerClient};
pub use error::{TriggerError, TriggerResult};
pub use server::{RemoteTriggerServer, RunningTriggerServer, TriggerServerOptions};
