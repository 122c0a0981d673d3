//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across all rtlink applications.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rtlink_common::config::{ConfigLoader, HardwareModuleConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = HardwareModuleConfig::load(Path::new("module.toml"))?;
//!     config.validate()?;
//!     println!("Module: {}", config.module_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_RT_PRIORITY, DEFAULT_TRIGGER_POLL_INTERVAL_MS, SEGMENT_NAME_PREFIX,
    SEGMENT_NAME_SEPARATOR,
};
use crate::error::ErrorKind;
use crate::thread::ThreadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound => ErrorKind::NotFound,
            Self::ParseError(_) => ErrorKind::Decode,
            Self::ValidationError(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Log level for application logging.
///
/// Represents the verbosity level of logging output.
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all rtlink applications.
///
/// This struct should be embedded in application-specific configuration
/// structs to provide consistent base configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "gripper-module-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_trigger_poll_interval_ms() -> u64 {
    DEFAULT_TRIGGER_POLL_INTERVAL_MS
}

fn default_rt_priority() -> i32 {
    DEFAULT_RT_PRIORITY
}

/// Real-time scheduling settings for module threads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// CPU core the real-time threads are pinned to.
    pub cpu_core: usize,

    /// SCHED_FIFO priority (1-99).
    #[serde(default = "default_rt_priority")]
    pub priority: i32,
}

/// Configuration of a hardware module process.
///
/// # TOML Example
///
/// ```toml
/// module_name = "gripper"
/// shared_memory_namespace = "cell_a"
/// trigger_poll_interval_ms = 5
///
/// [shared]
/// service_name = "gripper-module-01"
///
/// [realtime]
/// cpu_core = 3
/// priority = 85
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareModuleConfig {
    /// Common fields.
    pub shared: SharedConfig,

    /// Module name, the middle component of every segment name it exports.
    pub module_name: String,

    /// Shared memory namespace; empty means no namespace component.
    #[serde(default)]
    pub shared_memory_namespace: String,

    /// How long a trigger server waits per loop iteration before re-checking
    /// its stop handle.
    #[serde(default = "default_trigger_poll_interval_ms")]
    pub trigger_poll_interval_ms: u64,

    /// Real-time scheduling; `None` runs module threads with default policy.
    #[serde(default)]
    pub realtime: Option<RealtimeConfig>,
}

impl HardwareModuleConfig {
    /// Validate the module configuration.
    ///
    /// # Validation Rules
    /// 1. `shared` is valid
    /// 2. `module_name` is non-empty and contains neither `/` nor `__`
    /// 3. `shared_memory_namespace` contains neither `/` nor `__`
    /// 4. `trigger_poll_interval_ms` > 0
    /// 5. `realtime.priority` in 1..=99
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.module_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "module_name cannot be empty".to_string(),
            ));
        }
        validate_name_component("module_name", &self.module_name)?;
        validate_name_component("shared_memory_namespace", &self.shared_memory_namespace)?;

        if self.trigger_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "trigger_poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(rt) = &self.realtime
            && !(1..=99).contains(&rt.priority)
        {
            return Err(ConfigError::ValidationError(format!(
                "realtime.priority must be in 1..=99, got {}",
                rt.priority
            )));
        }
        Ok(())
    }

    /// Poll interval of trigger server loops.
    pub fn trigger_poll_interval(&self) -> Duration {
        Duration::from_millis(self.trigger_poll_interval_ms)
    }

    /// Thread options for a module thread with the given name.
    pub fn thread_options(&self, name: &str) -> ThreadOptions {
        let options = ThreadOptions::default().with_name(name);
        match &self.realtime {
            Some(rt) => options
                .with_realtime_priority(rt.priority)
                .with_cpu_affinity(vec![rt.cpu_core]),
            None => options,
        }
    }
}

fn validate_name_component(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.contains(SEGMENT_NAME_PREFIX) || value.contains(SEGMENT_NAME_SEPARATOR) {
        return Err(ConfigError::ValidationError(format!(
            "{field} '{value}' must not contain '{SEGMENT_NAME_PREFIX}' or '{SEGMENT_NAME_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
