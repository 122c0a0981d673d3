//! Common re-exports for convenience.
//!
//! ```rust
//! use rtlink_common::prelude::*;
//! ```

pub use crate::config::{
    ConfigError, ConfigLoader, HardwareModuleConfig, LogLevel, RealtimeConfig, SharedConfig,
};
pub use crate::consts::*;
pub use crate::error::ErrorKind;
pub use crate::thread::{StopSource, StopToken, Thread, ThreadError, ThreadOptions};
