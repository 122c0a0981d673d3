//! Module-side interface registry.
//!
//! A hardware module creates its interfaces through a
//! [`HardwareInterfaceRegistry`]: every interface becomes a segment named
//! after the module, the module's `cycle_state` segment is created up front,
//! and [`publish_module_info`](HardwareInterfaceRegistry::publish_module_info)
//! exports the directory consumers use for discovery.

use crate::cycle::{CycleStamped, CycleState};
use crate::error::InterfaceResult;
use crate::get_interface::{cycle_state_name, hardware_interface_name, hardware_module_name};
use crate::interface::{
    MutableHardwareInterfaceHandle, MutableStrictHardwareInterfaceHandle,
};
use rtlink_common::config::HardwareModuleConfig;
use rtlink_shared_memory::{
    ReadOnlySegment, ReadWriteSegment, SegmentName, SharedMemoryManager, ShmPayload,
};
use tracing::info;

/// Creates and owns the segments a hardware module exports.
pub struct HardwareInterfaceRegistry {
    namespace: String,
    module: String,
    manager: SharedMemoryManager,
    cycle_state: MutableHardwareInterfaceHandle<CycleState>,
    module_info_published: bool,
}

impl HardwareInterfaceRegistry {
    /// Registry for `module` in `namespace` (empty for none).
    ///
    /// Creates the module's `cycle_state` segment at cycle 0.
    pub fn new(namespace: &str, module: &str) -> InterfaceResult<Self> {
        let manager = SharedMemoryManager::new();
        let cycle_name = cycle_state_name(namespace, module)?;
        manager.add_segment_with_default::<CycleState>(&cycle_name, false)?;
        let cycle_state = MutableHardwareInterfaceHandle::new(ReadWriteSegment::attach(&cycle_name)?)?;

        info!(namespace, module, "hardware interface registry created");
        Ok(Self {
            namespace: namespace.to_string(),
            module: module.to_string(),
            manager,
            cycle_state,
            module_info_published: false,
        })
    }

    /// Registry for the module described by a validated configuration.
    pub fn from_config(config: &HardwareModuleConfig) -> InterfaceResult<Self> {
        config.validate()?;
        Self::new(&config.shared_memory_namespace, &config.module_name)
    }

    /// Namespace of this module.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of this module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Segment registry, e.g. for trigger servers of this module.
    pub fn manager(&self) -> &SharedMemoryManager {
        &self.manager
    }

    /// Segment name of one of this module's interfaces.
    pub fn interface_name(&self, interface: &str) -> InterfaceResult<SegmentName> {
        Ok(hardware_interface_name(&self.namespace, &self.module, interface)?)
    }

    /// Create an interface holding `value` and return a writable handle on it.
    pub fn advertise_interface<T: ShmPayload>(
        &self,
        interface: &str,
        must_be_used: bool,
        value: T,
    ) -> InterfaceResult<MutableHardwareInterfaceHandle<T>> {
        let name = self.interface_name(interface)?;
        self.manager.add_segment(&name, must_be_used, value)?;
        MutableHardwareInterfaceHandle::new(ReadWriteSegment::attach(&name)?)
    }

    /// Create an interface holding `T::default()`.
    pub fn advertise_interface_with_default<T: ShmPayload + Default>(
        &self,
        interface: &str,
        must_be_used: bool,
    ) -> InterfaceResult<MutableHardwareInterfaceHandle<T>> {
        self.advertise_interface(interface, must_be_used, T::default())
    }

    /// Create an interface and return a strict writable handle on it.
    pub fn advertise_strict_interface<T: ShmPayload + CycleStamped>(
        &self,
        interface: &str,
        must_be_used: bool,
        value: T,
    ) -> InterfaceResult<MutableStrictHardwareInterfaceHandle<T>> {
        let name = self.interface_name(interface)?;
        self.manager.add_segment(&name, must_be_used, value)?;
        let cycle_state = ReadOnlySegment::attach(self.cycle_state.name())?;
        MutableStrictHardwareInterfaceHandle::new(ReadWriteSegment::attach(&name)?, cycle_state)
    }

    /// Current cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle_state.read().cycle
    }

    /// Advance to the next cycle and return it.
    pub fn advance_cycle(&mut self) -> u64 {
        let cycle = self.cycle().wrapping_add(1);
        self.cycle_state.write(CycleState { cycle });
        cycle
    }

    /// Export the directory of every segment created so far under `module_info`.
    ///
    /// Can be called once; interfaces advertised afterwards are not listed.
    pub fn publish_module_info(&mut self) -> InterfaceResult<SegmentName> {
        let name = hardware_module_name(&self.namespace, &self.module)?;
        let directory = self.manager.get_directory()?;
        self.manager.add_segment(&name, false, directory)?;
        self.module_info_published = true;
        info!(
            module_info = %name,
            interfaces = directory.len(),
            "module info published"
        );
        Ok(name)
    }

    /// Whether [`publish_module_info`](Self::publish_module_info) succeeded.
    pub fn module_info_published(&self) -> bool {
        self.module_info_published
    }
}

impl std::fmt::Debug for HardwareInterfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareInterfaceRegistry")
            .field("namespace", &self.namespace)
            .field("module", &self.module)
            .field("cycle", &self.cycle())
            .field("segments", &self.manager.get_registered_memory_names())
            .finish()
    }
}
