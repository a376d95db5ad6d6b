// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Execution settings handed to a registry at construction.
//!
//! Plain values only: the application layer translates its configuration
//! file into these, so the runtime has no dependency on file formats.

use std::path::PathBuf;
use std::time::Duration;

use crate::backend::ExecutionStrategy;

pub const DEFAULT_UNITS_PER_THREAD: usize = 100_000;
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_millis(800);
pub const DEFAULT_BLOCK_SIZE: u32 = 256;

/// CUDA device selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuSettings {
    pub device_ordinal: usize,
    /// Precompiled PTX replacing the module embedded at build time
    pub kernel_module_path: Option<PathBuf>,
    /// Threads per block
    pub block_size: u32,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            device_ordinal: 0,
            kernel_module_path: None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Requested strategy, `None` runs the full probe chain
    pub strategy: Option<ExecutionStrategy>,
    pub units_per_thread: usize,
    pub worker_timeout: Duration,
    /// Worker budget, 0 = half the logical cores
    pub max_threads: usize,
    pub gpu: GpuSettings,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            strategy: None,
            units_per_thread: DEFAULT_UNITS_PER_THREAD,
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
            max_threads: 0,
            gpu: GpuSettings::default(),
        }
    }
}

impl ExecutionSettings {
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_units_per_thread(mut self, units: usize) -> Self {
        self.units_per_thread = units;
        self
    }

    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads;
        self
    }
}
