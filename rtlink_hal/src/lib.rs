//! # rtlink HAL Library
//!
//! Typed access to the interfaces hardware modules export through shared
//! memory.
//!
//! # Module Structure
//!
//! - [`cycle`] - Cycle state segment, `CycleStamped` payloads, freshness
//! - [`interface`] - Typed and strict handles
//! - [`get_interface`] - Name resolution and attach functions
//! - [`registry`] - Module-side interface registry and module info
//! - [`error`] - `InterfaceError`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐              ┌──────────────────────────┐
//! │ hardware module          │              │ control process          │
//! │                          │    /dev/shm  │                          │
//! │ HardwareInterfaceRegistry├─────────────►│ get_interface_handle<T>  │
//! │  advertise_interface<T>  │ /mod__iface  │ get_strict_interface_... │
//! │  publish_module_info     │ /mod__module_info                       │
//! │  advance_cycle           │ /mod__cycle_state                       │
//! └──────────────────────────┘              └──────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod cycle;
pub mod error;
pub mod get_interface;
pub mod interface;
pub mod registry;

// Re-export key types for convenience
pub use crate::cycle::{CycleStamped, CycleState, Freshness};
pub use crate::error::{InterfaceError, InterfaceResult};
pub use crate::get_interface::{
    get_hardware_module_info, get_interface_handle, get_interfaces_from_module_info,
    get_mutable_interface_handle, get_mutable_strict_interface_handle,
    get_required_interfaces_from_module_info, get_strict_interface_handle,
};
pub use crate::interface::{
    HardwareInterfaceHandle, MutableHardwareInterfaceHandle, MutableStrictHardwareInterfaceHandle,
    StrictHardwareInterfaceHandle,
};
pub use crate::registry::HardwareInterfaceRegistry;
