//! rtlink Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the thread wrapper used by all rtlink workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Naming, layout and timing constants (single source of truth)
//! - [`config`] - Configuration loading traits and types
//! - [`error`] - Error classification shared by all crates
//! - [`thread`] - Thread wrapper with explicit stop handles
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rtlink_common::consts::*;
//! use rtlink_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod error;
pub mod prelude;
pub mod thread;
