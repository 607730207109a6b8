use cmdroute_kernel::toy::toy_registry;
use cmdroute_kernel::{EngineConfig, Registry};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process;

/// Exit code for usage and input errors.
pub const EXIT_USAGE: i32 = 2;

pub fn load_config_or_exit(config: Option<&str>) -> EngineConfig {
    let Some(path) = config else {
        return EngineConfig::default();
    };
    EngineConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load config {path}: {e}");
        process::exit(EXIT_USAGE);
    })
}

/// The toy command set, frozen under the given config.
pub fn registry_or_exit(config: Option<&str>) -> Registry {
    let config = load_config_or_exit(config);
    toy_registry(config).unwrap_or_else(|e| {
        eprintln!("error: failed to build command registry: {e}");
        process::exit(EXIT_USAGE);
    })
}

pub fn read_file_or_exit(path: &str) -> String {
    fs::read_to_string(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("error: failed to read {path}: {e}");
        process::exit(EXIT_USAGE);
    })
}

pub fn render_json_or_exit<T: Serialize + ?Sized>(value: &T, what: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render {what} JSON: {e}");
        process::exit(EXIT_USAGE);
    })
}

pub fn runtime_or_exit() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(EXIT_USAGE);
        })
}
