//! Hardware interface handle tests.
//!
//! A `HardwareInterfaceRegistry` plays the hardware module; the free
//! `get_*_interface_handle` functions play the consumer attaching by name.

use rtlink_common::config::{ConfigLoader, HardwareModuleConfig, LogLevel, SharedConfig};
use rtlink_common::error::ErrorKind;
use rtlink_hal::{
    CycleStamped, Freshness, HardwareInterfaceRegistry, InterfaceError, get_hardware_module_info,
    get_interface_handle, get_interfaces_from_module_info, get_mutable_interface_handle,
    get_mutable_strict_interface_handle, get_required_interfaces_from_module_info,
    get_strict_interface_handle,
};
use rtlink_shared_memory::impl_shm_payload;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct JointCommand {
    position: [f64; 6],
    updated_cycle: u64,
}

impl_shm_payload!(JointCommand => "JointCommand");

impl CycleStamped for JointCommand {
    fn updated_cycle(&self) -> u64 {
        self.updated_cycle
    }

    fn set_updated_cycle(&mut self, cycle: u64) {
        self.updated_cycle = cycle;
    }
}

fn module(tag: &str) -> String {
    format!("{tag}_{}", std::process::id())
}

#[test]
fn typed_handle_reads_advertised_value() {
    let module = module("typed");
    let registry = HardwareInterfaceRegistry::new("", &module).unwrap();
    let mut producer = registry
        .advertise_interface("temperature", true, 21.5f32)
        .unwrap();

    let consumer = get_interface_handle::<f32>("", &module, "temperature").unwrap();
    assert_eq!(consumer.read(), 21.5);

    producer.write(22.0);
    assert_eq!(consumer.read(), 22.0);
}

#[test]
fn type_mismatch_reports_both_tags() {
    let module = module("mismatch");
    let registry = HardwareInterfaceRegistry::new("", &module).unwrap();
    registry
        .advertise_interface("counter", false, 42i32)
        .unwrap();

    let err = get_interface_handle::<f32>("", &module, "counter").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    let message = err.to_string();
    assert!(message.contains("Float"), "{message}");
    assert!(message.contains("Int32"), "{message}");

    let err = get_mutable_interface_handle::<f32>("", &module, "counter").unwrap_err();
    assert!(matches!(err, InterfaceError::TypeMismatch { .. }));
}

#[test]
fn missing_interface_keeps_not_found_kind() {
    let err = get_interface_handle::<i32>("", &module("absent"), "nothing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn strict_handle_tracks_cycle_freshness() {
    let module = module("strict");
    let mut registry = HardwareInterfaceRegistry::new("cell", &module).unwrap();
    registry
        .advertise_interface_with_default::<JointCommand>("command", true)
        .unwrap();

    let mut writer =
        get_mutable_strict_interface_handle::<JointCommand>("cell", &module, "command").unwrap();
    let reader = get_strict_interface_handle::<JointCommand>("cell", &module, "command").unwrap();

    // Default payload is stamped with cycle 0, the initial cycle.
    assert_eq!(reader.freshness(), Freshness::Fresh);

    registry.advance_cycle();
    assert_eq!(reader.current_cycle(), 1);
    assert_eq!(reader.freshness(), Freshness::Stale);
    assert!(!writer.is_fresh());

    let stamped = writer.commit(JointCommand {
        position: [0.1; 6],
        ..JointCommand::default()
    });
    assert_eq!(stamped, 1);
    let (value, freshness) = reader.read();
    assert_eq!(freshness, Freshness::Fresh);
    assert_eq!(value.position, [0.1; 6]);
    assert_eq!(value.updated_cycle, 1);

    registry.advance_cycle();
    assert!(!reader.is_fresh());
}

#[test]
fn strict_handle_requires_cycle_state() {
    let module = module("nocycle");
    let registry = HardwareInterfaceRegistry::new("", &module).unwrap();
    registry
        .advertise_interface_with_default::<JointCommand>("command", false)
        .unwrap();
    // Another module name has no cycle state.
    let err =
        get_strict_interface_handle::<JointCommand>("", &format!("{module}x"), "command").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn module_info_lists_interfaces_and_required_subset() {
    let module = module("info");
    let mut registry = HardwareInterfaceRegistry::new("plant", &module).unwrap();
    registry.advertise_interface("state", true, 0u32).unwrap();
    registry.advertise_interface("diagnostics", false, 0u64).unwrap();
    registry.advertise_interface("command", true, 0i16).unwrap();
    registry.publish_module_info().unwrap();
    assert!(registry.module_info_published());

    let info = get_hardware_module_info("plant", &module).unwrap();
    let directory = info.read();
    assert_eq!(
        get_interfaces_from_module_info(&directory).unwrap(),
        ["cycle_state", "state", "diagnostics", "command"]
    );
    assert_eq!(
        get_required_interfaces_from_module_info(&directory).unwrap(),
        ["state", "command"]
    );

    let err = registry.publish_module_info().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn registry_from_config_validates_first() {
    let mut config = HardwareModuleConfig {
        shared: SharedConfig {
            log_level: LogLevel::Info,
            service_name: "svc".to_string(),
        },
        module_name: module("configured"),
        shared_memory_namespace: String::new(),
        trigger_poll_interval_ms: 10,
        realtime: None,
    };
    let registry = HardwareInterfaceRegistry::from_config(&config).unwrap();
    assert_eq!(registry.module(), config.module_name);
    drop(registry);

    config.module_name = "bad/name".to_string();
    let err = HardwareInterfaceRegistry::from_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn registry_from_config_file_uses_namespace() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("module.toml");
    let module = module("filed");
    std::fs::write(
        &path,
        format!(
            r#"module_name = "{module}"
shared_memory_namespace = "cell_a"

[shared]
service_name = "filed-01"
"#
        ),
    )
    .unwrap();

    let config = HardwareModuleConfig::load(&path).unwrap();
    let registry = HardwareInterfaceRegistry::from_config(&config).unwrap();
    registry.advertise_interface("value", true, 7i32).unwrap();

    let handle = get_interface_handle::<i32>("cell_a", &module, "value").unwrap();
    assert_eq!(handle.read(), 7);
    assert_eq!(
        get_interface_handle::<i32>("", &module, "value")
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn interfaces_disappear_with_registry() {
    let module = module("teardown");
    {
        let registry = HardwareInterfaceRegistry::new("", &module).unwrap();
        registry.advertise_interface("value", false, 1u8).unwrap();
        assert!(get_interface_handle::<u8>("", &module, "value").is_ok());
    }
    let err = get_interface_handle::<u8>("", &module, "value").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
