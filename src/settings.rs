// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file -> runtime settings.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use arti_config::{validate_config, ArtiConfig};
use arti_npu_runtime::{ExecutionSettings, ExecutionStrategy, GpuSettings, NodeRegistry};
use arti_observability::{CrateDebugFlags, LogFormat, LoggingSettings};
use tracing::info;

/// Translate `[execution]` and `[gpu]` into [`ExecutionSettings`].
///
/// `strategy = "auto"` leaves the choice to the hardware probe.
pub fn execution_settings(config: &ArtiConfig) -> Result<ExecutionSettings> {
    let execution = &config.execution;
    let strategy = match execution.strategy.trim() {
        s if s.eq_ignore_ascii_case("auto") => None,
        s => Some(
            s.parse::<ExecutionStrategy>()
                .map_err(|e| anyhow!("execution.strategy: {}", e))?,
        ),
    };

    Ok(ExecutionSettings {
        strategy,
        units_per_thread: execution.units_per_thread,
        worker_timeout: Duration::from_millis(execution.worker_timeout_ms),
        max_threads: execution.max_threads,
        gpu: GpuSettings {
            device_ordinal: config.gpu.device_ordinal,
            kernel_module_path: config.gpu.kernel_module_path.clone(),
            block_size: config.gpu.block_size,
        },
    })
}

/// Translate `[logging]` into [`LoggingSettings`], keeping the given debug flags.
pub fn logging_settings(config: &ArtiConfig, debug_flags: CrateDebugFlags) -> Result<LoggingSettings> {
    let format = config
        .logging
        .format
        .parse::<LogFormat>()
        .context("logging.format")?;

    Ok(LoggingSettings {
        level: config.logging.level.clone(),
        format,
        log_dir: config.logging.log_dir.clone(),
        debug_flags,
        ..Default::default()
    })
}

/// Validate the configuration and build a probed registry from it.
pub fn build_registry(config: &ArtiConfig) -> Result<NodeRegistry> {
    validate_config(config)?;
    let settings = execution_settings(config)?;
    let registry = NodeRegistry::new(settings);
    info!(
        strategy = %registry.selected_strategy(),
        backend = registry.backend_name(),
        max_threads = registry.max_threads(),
        "registry ready"
    );
    Ok(registry)
}
