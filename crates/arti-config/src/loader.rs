// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base values, missing keys take defaults)
//! 2. Environment variables (`ARTI_*`)
//! 3. CLI arguments

use crate::{ArtiConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "arti_configuration.toml";

/// Find the ARTI configuration file
///
/// Search order:
/// 1. `ARTI_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("ARTI_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by ARTI_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "ARTI configuration file '{}' not found in any of these locations:\n{}\n\nSet ARTI_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ArtiConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ArtiConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`] with no explicit path, but falls back to defaults
/// (plus overrides) when no file is found.
///
/// Parse and IO errors on a file that does exist are still returned.
pub fn load_config_or_default(cli_args: Option<&HashMap<String, String>>) -> ConfigResult<ArtiConfig> {
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = ArtiConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `ARTI_STRATEGY` -> `execution.strategy`
/// - `ARTI_UNITS_PER_THREAD` -> `execution.units_per_thread`
/// - `ARTI_WORKER_TIMEOUT_MS` -> `execution.worker_timeout_ms`
/// - `ARTI_MAX_THREADS` -> `execution.max_threads`
/// - `ARTI_GPU_DEVICE` -> `gpu.device_ordinal`
/// - `ARTI_KERNEL_MODULE` -> `gpu.kernel_module_path`
/// - `ARTI_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut ArtiConfig) {
    if let Ok(value) = env::var("ARTI_STRATEGY") {
        config.execution.strategy = value;
    }
    if let Ok(value) = env::var("ARTI_UNITS_PER_THREAD") {
        if let Ok(units) = value.parse() {
            config.execution.units_per_thread = units;
        }
    }
    if let Ok(value) = env::var("ARTI_WORKER_TIMEOUT_MS") {
        if let Ok(timeout) = value.parse() {
            config.execution.worker_timeout_ms = timeout;
        }
    }
    if let Ok(value) = env::var("ARTI_MAX_THREADS") {
        if let Ok(threads) = value.parse() {
            config.execution.max_threads = threads;
        }
    }

    if let Ok(value) = env::var("ARTI_GPU_DEVICE") {
        if let Ok(ordinal) = value.parse() {
            config.gpu.device_ordinal = ordinal;
        }
    }
    if let Ok(value) = env::var("ARTI_KERNEL_MODULE") {
        config.gpu.kernel_module_path = Some(PathBuf::from(value));
    }

    if let Ok(value) = env::var("ARTI_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `strategy`, `units_per_thread`, `worker_timeout_ms`, `max_threads`,
/// `gpu_device`, `kernel_module`, `log_level`, `log_format`, `log_dir`.
/// Unknown keys are ignored.
pub fn apply_cli_overrides(config: &mut ArtiConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("strategy") {
        config.execution.strategy = value.clone();
    }
    if let Some(units) = cli_args.get("units_per_thread").and_then(|v| v.parse().ok()) {
        config.execution.units_per_thread = units;
    }
    if let Some(timeout) = cli_args.get("worker_timeout_ms").and_then(|v| v.parse().ok()) {
        config.execution.worker_timeout_ms = timeout;
    }
    if let Some(threads) = cli_args.get("max_threads").and_then(|v| v.parse().ok()) {
        config.execution.max_threads = threads;
    }

    if let Some(ordinal) = cli_args.get("gpu_device").and_then(|v| v.parse().ok()) {
        config.gpu.device_ordinal = ordinal;
    }
    if let Some(value) = cli_args.get("kernel_module") {
        config.gpu.kernel_module_path = Some(PathBuf::from(value));
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
}
