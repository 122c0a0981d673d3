//! Resolve and attach hardware interfaces exported by a module.
//!
//! Interfaces live at `/<namespace>__<module>__<interface>` (namespace optional).
//! Every module also exports `module_info`, a [`SegmentDirectory`] listing its
//! interfaces, and `cycle_state`, which strict handles compare against.

use crate::cycle::{CycleStamped, CycleState};
use crate::error::InterfaceResult;
use crate::interface::{
    HardwareInterfaceHandle, MutableHardwareInterfaceHandle, MutableStrictHardwareInterfaceHandle,
    StrictHardwareInterfaceHandle, check_type_tag,
};
use rtlink_common::consts::{CYCLE_STATE_INTERFACE_NAME, MODULE_INFO_INTERFACE_NAME};
use rtlink_shared_memory::{
    ReadOnlySegment, ReadWriteSegment, SegmentDirectory, SegmentName, ShmPayload, ShmResult,
};
use tracing::debug;

/// Segment name of a hardware interface.
pub fn hardware_interface_name(
    namespace: &str,
    module: &str,
    interface: &str,
) -> ShmResult<SegmentName> {
    SegmentName::new(namespace, module, interface)
}

/// Segment name of a module's directory.
pub fn hardware_module_name(namespace: &str, module: &str) -> ShmResult<SegmentName> {
    SegmentName::new(namespace, module, MODULE_INFO_INTERFACE_NAME)
}

/// Segment name of a module's cycle state.
pub fn cycle_state_name(namespace: &str, module: &str) -> ShmResult<SegmentName> {
    SegmentName::new(namespace, module, CYCLE_STATE_INTERFACE_NAME)
}

/// Attach a read-only handle, checking the type tag.
pub fn get_interface_handle<T: ShmPayload>(
    namespace: &str,
    module: &str,
    interface: &str,
) -> InterfaceResult<HardwareInterfaceHandle<T>> {
    let name = hardware_interface_name(namespace, module, interface)?;
    let handle = HardwareInterfaceHandle::new(ReadOnlySegment::attach(&name)?)?;
    debug!(interface = %name, type_tag = T::TYPE_TAG, "interface handle attached");
    Ok(handle)
}

/// Attach a read-write handle, checking the type tag.
pub fn get_mutable_interface_handle<T: ShmPayload>(
    namespace: &str,
    module: &str,
    interface: &str,
) -> InterfaceResult<MutableHardwareInterfaceHandle<T>> {
    let name = hardware_interface_name(namespace, module, interface)?;
    let handle = MutableHardwareInterfaceHandle::new(ReadWriteSegment::attach(&name)?)?;
    debug!(interface = %name, type_tag = T::TYPE_TAG, "mutable interface handle attached");
    Ok(handle)
}

/// Attach a read-only strict handle bound to the module's cycle state.
pub fn get_strict_interface_handle<T: ShmPayload + CycleStamped>(
    namespace: &str,
    module: &str,
    interface: &str,
) -> InterfaceResult<StrictHardwareInterfaceHandle<T>> {
    let name = hardware_interface_name(namespace, module, interface)?;
    let segment = ReadOnlySegment::attach(&name)?;
    let cycle_state = attach_cycle_state(namespace, module)?;
    let handle = StrictHardwareInterfaceHandle::new(segment, cycle_state)?;
    debug!(interface = %name, type_tag = T::TYPE_TAG, "strict interface handle attached");
    Ok(handle)
}

/// Attach a read-write strict handle bound to the module's cycle state.
pub fn get_mutable_strict_interface_handle<T: ShmPayload + CycleStamped>(
    namespace: &str,
    module: &str,
    interface: &str,
) -> InterfaceResult<MutableStrictHardwareInterfaceHandle<T>> {
    let name = hardware_interface_name(namespace, module, interface)?;
    let segment = ReadWriteSegment::attach(&name)?;
    let cycle_state = attach_cycle_state(namespace, module)?;
    let handle = MutableStrictHardwareInterfaceHandle::new(segment, cycle_state)?;
    debug!(interface = %name, type_tag = T::TYPE_TAG, "mutable strict interface handle attached");
    Ok(handle)
}

fn attach_cycle_state(namespace: &str, module: &str) -> InterfaceResult<ReadOnlySegment<CycleState>> {
    Ok(ReadOnlySegment::attach(&cycle_state_name(namespace, module)?)?)
}

/// Attach the directory a module publishes under `module_info`.
pub fn get_hardware_module_info(
    namespace: &str,
    module: &str,
) -> InterfaceResult<ReadOnlySegment<SegmentDirectory>> {
    let name = hardware_module_name(namespace, module)?;
    let segment = ReadOnlySegment::<SegmentDirectory>::attach(&name)?;
    check_type_tag::<SegmentDirectory>(&name, segment.header())?;
    Ok(segment)
}

/// Interface names listed in a module directory.
///
/// Fails with a decode error if a record is not `"/<module>__<segment>"`.
pub fn get_interfaces_from_module_info(
    module_info: &SegmentDirectory,
) -> InterfaceResult<Vec<String>> {
    Ok(module_info.interface_names()?)
}

/// Interface names of the segments a module marks as required.
pub fn get_required_interfaces_from_module_info(
    module_info: &SegmentDirectory,
) -> InterfaceResult<Vec<String>> {
    Ok(module_info.required_interface_names()?)
}
