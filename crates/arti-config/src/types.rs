// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Mirrors the sections of `arti_configuration.toml`. Every struct uses
//! `#[serde(default)]` so a partial file is always accepted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtiConfig {
    pub execution: ExecutionConfig,
    pub gpu: GpuConfig,
    pub logging: LoggingConfig,
}

/// `[execution]`: strategy selection and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// "auto", "gpu", "simd", "multi_threaded" or "single_threaded"
    pub strategy: String,
    /// Units per worker before another worker is added
    pub units_per_thread: usize,
    /// Bounded wait for multi-threaded workers
    pub worker_timeout_ms: u64,
    /// Worker budget; 0 = half the logical cores
    pub max_threads: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: "auto".to_string(),
            units_per_thread: 100_000,
            worker_timeout_ms: 800,
            max_threads: 0,
        }
    }
}

/// `[gpu]`: CUDA device and kernel module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    pub device_ordinal: usize,
    /// Precompiled PTX; the module embedded at build time is used when unset
    pub kernel_module_path: Option<PathBuf>,
    pub block_size: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            device_ordinal: 0,
            kernel_module_path: None,
            block_size: 256,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// "text" or "json"
    pub format: String,
    /// Daily-rotated log files go here when set
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ArtiConfig = toml::from_str(
            r#"
            [execution]
            strategy = "simd"

            [gpu]
            kernel_module_path = "/opt/arti/kernels.ptx"
            "#,
        )
        .unwrap();

        assert_eq!(config.execution.strategy, "simd");
        assert_eq!(config.execution.units_per_thread, 100_000);
        assert_eq!(config.execution.worker_timeout_ms, 800);
        assert_eq!(config.gpu.block_size, 256);
        assert_eq!(
            config.gpu.kernel_module_path,
            Some(PathBuf::from("/opt/arti/kernels.ptx"))
        );
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: ArtiConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArtiConfig::default());
    }
}
