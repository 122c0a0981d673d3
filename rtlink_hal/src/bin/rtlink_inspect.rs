//! # rtlink Inspect
//!
//! Lists the interfaces a hardware module exports, read from its `module_info`
//! segment.
//!
//! # Usage
//!
//! ```bash
//! # All interfaces of module "gripper"
//! rtlink_inspect --module gripper
//!
//! # Required interfaces only, namespaced, as JSON
//! rtlink_inspect --namespace cell_a --module gripper --required --json
//!
//! # Namespace and module taken from the module configuration
//! rtlink_inspect --config /etc/rtlink/module.toml
//! ```

use clap::Parser;
use rtlink_common::config::{ConfigError, ConfigLoader, HardwareModuleConfig, LogLevel};
use rtlink_common::consts::DEFAULT_CONFIG_PATH;
use rtlink_hal::get_interface::hardware_interface_name;
use rtlink_hal::{
    get_hardware_module_info, get_interfaces_from_module_info,
    get_required_interfaces_from_module_info,
};
use rtlink_shared_memory::inspect;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::EnvFilter;

/// rtlink Inspect - list hardware module interfaces
#[derive(Parser, Debug)]
#[command(name = "rtlink_inspect")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "List the shared memory interfaces exported by a hardware module")]
#[command(long_about = None)]
struct Args {
    /// Shared memory namespace (overrides the configuration)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Module name (overrides the configuration)
    #[arg(short, long)]
    module: Option<String>,

    /// Module configuration file supplying namespace and module name
    /// (defaults to /etc/rtlink/module.toml when --module is not given)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List only interfaces marked as required
    #[arg(short, long)]
    required: bool,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// One listed interface.
#[derive(Debug, Serialize)]
struct InterfaceReport {
    interface: String,
    segment: String,
    type_tag: Option<String>,
    payload_size: Option<usize>,
    required: Option<bool>,
    attach_count: Option<u32>,
    owner_pid: Option<u32>,
}

/// Listing of one module.
#[derive(Debug, Serialize)]
struct ModuleReport {
    namespace: String,
    module: String,
    interfaces: Vec<InterfaceReport>,
}

fn main() {
    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rtlink_inspect: cannot load module configuration: {e}");
            std::process::exit(1);
        }
    };
    setup_tracing(&args, config.as_ref().map(|c| c.shared.log_level));

    if let Err(e) = run(&args, config.as_ref()) {
        error!("inspect failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: Option<&HardwareModuleConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let (namespace, module) = resolve_module(args, config)?;
    debug!(namespace = %namespace, module = %module, "inspecting module");

    let module_info = get_hardware_module_info(&namespace, &module)?;
    let directory = module_info.read();
    let interfaces = if args.required {
        get_required_interfaces_from_module_info(&directory)?
    } else {
        get_interfaces_from_module_info(&directory)?
    };

    let mut report = ModuleReport {
        namespace,
        module,
        interfaces: Vec::with_capacity(interfaces.len()),
    };
    for interface in interfaces {
        let segment = hardware_interface_name(&report.namespace, &report.module, &interface)?;
        let info = match inspect(&segment) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(segment = %segment, "header unavailable: {e}");
                None
            }
        };
        report.interfaces.push(InterfaceReport {
            interface,
            segment: segment.to_string(),
            type_tag: info.as_ref().map(|i| i.type_tag.clone()),
            payload_size: info.as_ref().map(|i| i.payload_size),
            required: info.as_ref().map(|i| i.must_be_used),
            attach_count: info.as_ref().map(|i| i.attach_count),
            owner_pid: info.as_ref().map(|i| i.owner_pid),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

/// Configuration file to read: `--config`, else the default path unless
/// `--module` was given.
fn config_path(args: &Args) -> Option<PathBuf> {
    match (&args.config, &args.module) {
        (Some(path), _) => Some(path.clone()),
        (None, None) => Some(PathBuf::from(DEFAULT_CONFIG_PATH)),
        (None, Some(_)) => None,
    }
}

fn load_config(args: &Args) -> Result<Option<HardwareModuleConfig>, ConfigError> {
    let Some(path) = config_path(args) else {
        return Ok(None);
    };
    let config = HardwareModuleConfig::load(&path)?;
    config.validate()?;
    Ok(Some(config))
}

/// Namespace and module from flags, falling back to the configuration.
fn resolve_module(
    args: &Args,
    config: Option<&HardwareModuleConfig>,
) -> Result<(String, String), Box<dyn std::error::Error>> {
    let namespace = args
        .namespace
        .clone()
        .or_else(|| config.map(|c| c.shared_memory_namespace.clone()))
        .unwrap_or_default();
    let module = args
        .module
        .clone()
        .or_else(|| config.map(|c| c.module_name.clone()))
        .ok_or("either --module or a configuration file is required")?;
    Ok((namespace, module))
}

fn print_table(report: &ModuleReport) {
    println!(
        "module '{}' (namespace '{}'): {} interface(s)",
        report.module,
        report.namespace,
        report.interfaces.len()
    );
    for entry in &report.interfaces {
        let required = match entry.required {
            Some(true) => "required",
            Some(false) => "optional",
            None => "?",
        };
        println!(
            "  {:<32} {:<24} {:>8} {:<8} attached={} owner={}",
            entry.interface,
            entry.type_tag.as_deref().unwrap_or("?"),
            entry
                .payload_size
                .map_or_else(|| "?".to_string(), |s| format!("{s}B")),
            required,
            entry
                .attach_count
                .map_or_else(|| "?".to_string(), |c| c.to_string()),
            entry
                .owner_pid
                .map_or_else(|| "?".to_string(), |p| p.to_string()),
        );
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let level = tracing_level(args.verbose, configured);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// `-v` wins, then the configured level, then WARN.
fn tracing_level(verbose: bool, configured: Option<LogLevel>) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    configured
        .and_then(|level| level.as_str().parse().ok())
        .unwrap_or(Level::WARN)
}
