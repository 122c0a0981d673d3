//! System-wide constants for the rtlink workspace.
//!
//! Single source of truth for naming rules, segment layout limits and timing
//! defaults. Imported by all crates; no duplication permitted.

/// Maximum length of a segment name in bytes, including the leading `/`.
///
/// Matches the POSIX shared memory name limit on Linux.
pub const SEGMENT_NAME_MAX_LEN: usize = 255;

/// Leading character of every segment name.
pub const SEGMENT_NAME_PREFIX: char = '/';

/// Separator joining namespace, module and interface inside a segment name.
pub const SEGMENT_NAME_SEPARATOR: &str = "__";

/// Maximum length of a segment type tag in bytes.
pub const TYPE_TAG_MAX_LEN: usize = 96;

/// Maximum number of records in a module directory.
pub const MAX_DIRECTORY_ENTRIES: usize = 64;

/// CPU cache line size in bytes.
///
/// Segment headers are aligned to this to keep payloads off the header's line.
pub const CACHE_LINE_SIZE: usize = 64;

/// Interface name of the directory segment every hardware module exports.
pub const MODULE_INFO_INTERFACE_NAME: &str = "module_info";

/// Interface name of the per-module cycle state segment.
pub const CYCLE_STATE_INTERFACE_NAME: &str = "cycle_state";

/// Suffix appended to a trigger server name for its request primitive.
pub const TRIGGER_REQUEST_SUFFIX: &str = "_req";

/// Suffix appended to a trigger server name for its response primitive.
pub const TRIGGER_RESPONSE_SUFFIX: &str = "_resp";

/// Default poll interval of a trigger server loop in milliseconds.
///
/// Bounds how long a running server takes to observe a stop request.
pub const DEFAULT_TRIGGER_POLL_INTERVAL_MS: u64 = 10;

/// Default SCHED_FIFO priority for real-time threads.
pub const DEFAULT_RT_PRIORITY: i32 = 80;

/// Default module configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rtlink/module.toml";
