// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Execution Strategies
//!
//! One trait, four implementations. A registry picks one backend when it is
//! constructed and every array it serves steps through that backend.
//!
//! | Strategy | Backend | Fan-out |
//! |---|---|---|
//! | GPU | [`CudaBackend`] | one kernel launch per step |
//! | SIMD | [`SimdBackend`] | rayon pool, in-place batches, lane kernel |
//! | MultiThreaded | [`ThreadedBackend`] | rayon pool, owned batches, bounded wait |
//! | SingleThreaded | [`SingleThreadedBackend`] | none (reference semantics) |

mod simd;
mod single;
mod threaded;

#[cfg(feature = "cuda")]
mod cuda_backend;

#[cfg(feature = "cuda")]
pub use cuda_backend::{is_cuda_available, CudaBackend};
pub use simd::SimdBackend;
pub use single::SingleThreadedBackend;
pub use threaded::ThreadedBackend;

use std::ops::Range;
use std::time::Duration;

use arti_npu_neural::IzhikevichParameters;
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::registry::GpuSettings;

/// Step algorithm a registry selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    Gpu,
    Simd,
    MultiThreaded,
    SingleThreaded,
}

impl ExecutionStrategy {
    /// Probe order, first usable wins
    pub const PROBE_ORDER: [ExecutionStrategy; 4] = [
        ExecutionStrategy::Gpu,
        ExecutionStrategy::Simd,
        ExecutionStrategy::MultiThreaded,
        ExecutionStrategy::SingleThreaded,
    ];

    /// Remaining probe chain starting at `self`
    pub fn fallback_chain(self) -> &'static [ExecutionStrategy] {
        let start = Self::PROBE_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::PROBE_ORDER.len() - 1);
        &Self::PROBE_ORDER[start..]
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::Gpu => write!(f, "gpu"),
            ExecutionStrategy::Simd => write!(f, "simd"),
            ExecutionStrategy::MultiThreaded => write!(f, "multi_threaded"),
            ExecutionStrategy::SingleThreaded => write!(f, "single_threaded"),
        }
    }
}

impl std::str::FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "gpu" | "cuda" => Ok(ExecutionStrategy::Gpu),
            "simd" => Ok(ExecutionStrategy::Simd),
            "multi_threaded" | "mt" | "threaded" => Ok(ExecutionStrategy::MultiThreaded),
            "single_threaded" | "st" | "single" => Ok(ExecutionStrategy::SingleThreaded),
            _ => Err(format!("Unknown execution strategy: {}", s)),
        }
    }
}

/// Batching parameters read once per step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub max_threads: usize,
    pub units_per_thread: usize,
    pub worker_timeout: Duration,
}

/// How one step splits `units` across workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub threads: usize,
    /// Units per worker batch
    pub batch: usize,
}

impl Partition {
    /// Range handled by worker `index`
    pub fn batch_range(&self, index: usize) -> Range<usize> {
        index * self.batch..(index + 1) * self.batch
    }

    /// First unit left to the caller
    pub fn remainder_start(&self) -> usize {
        self.threads * self.batch
    }
}

impl DispatchPlan {
    /// `threads = min(max_threads, units / units_per_thread + 1)`, `batch = units / threads`.
    ///
    /// Units past `threads * batch` are the caller's remainder.
    pub fn partition(&self, units: usize) -> Partition {
        let threads = self
            .max_threads
            .max(1)
            .min(units / self.units_per_thread.max(1) + 1);
        Partition {
            threads,
            batch: units / threads,
        }
    }
}

/// Per-unit node state borrowed from a node array for one step
pub struct NodeState<'a> {
    pub input: &'a [f32],
    pub u: &'a mut [f32],
    pub v: &'a mut [f32],
    pub spike: &'a mut [f32],
}

impl NodeState<'_> {
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn check_lengths(&self) -> Result<()> {
        let n = self.input.len();
        for len in [self.u.len(), self.v.len(), self.spike.len()] {
            if len != n {
                return Err(RuntimeError::IndexOutOfRange { index: len, len: n });
            }
        }
        Ok(())
    }
}

/// Per-synapse plasticity state borrowed from a synapse array for one step
pub struct SynapseState<'a> {
    pub pre_spike: &'a [f32],
    pub big_u: &'a [f32],
    pub tf: &'a [f32],
    pub td: &'a [f32],
    pub u: &'a mut [f32],
    pub x: &'a mut [f32],
    pub release: &'a mut [f32],
}

impl SynapseState<'_> {
    pub fn len(&self) -> usize {
        self.pre_spike.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pre_spike.is_empty()
    }

    fn check_lengths(&self) -> Result<()> {
        let n = self.pre_spike.len();
        for len in [
            self.big_u.len(),
            self.tf.len(),
            self.td.len(),
            self.u.len(),
            self.x.len(),
            self.release.len(),
        ] {
            if len != n {
                return Err(RuntimeError::IndexOutOfRange { index: len, len: n });
            }
        }
        Ok(())
    }
}

/// Step backend trait (single-threaded, multi-threaded, SIMD, CUDA)
///
/// Backends are shared by every array of a registry, so stepping takes `&self`.
/// Every strategy must produce the single-threaded result up to rounding.
pub trait StepBackend: Send + Sync {
    /// Strategy this backend implements
    fn strategy(&self) -> ExecutionStrategy;

    /// Get backend name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Size of the worker pool batches run on, `None` if the backend does
    /// not batch on CPU workers
    fn worker_count(&self) -> Option<usize> {
        None
    }

    /// Advance every unit of a node array by one tick
    fn step_nodes(
        &self,
        plan: &DispatchPlan,
        params: &IzhikevichParameters,
        state: NodeState<'_>,
    ) -> Result<()>;

    /// Advance every synapse of a synapse array by one tick
    fn step_synapses(&self, plan: &DispatchPlan, state: SynapseState<'_>) -> Result<()>;
}

/// Build the backend for one strategy.
///
/// Fails when the strategy cannot run here (no device, pool creation failed);
/// the registry turns that into a fallback.
pub fn create_backend(
    strategy: ExecutionStrategy,
    max_threads: usize,
    gpu: &GpuSettings,
) -> Result<Box<dyn StepBackend>> {
    debug!(target: "arti-npu-runtime", "Creating {} backend ({} threads)", strategy, max_threads);
    match strategy {
        ExecutionStrategy::Gpu => create_gpu_backend(gpu),
        ExecutionStrategy::Simd => Ok(Box::new(SimdBackend::new(max_threads)?)),
        ExecutionStrategy::MultiThreaded => Ok(Box::new(ThreadedBackend::new(max_threads)?)),
        ExecutionStrategy::SingleThreaded => Ok(Box::new(SingleThreadedBackend::new())),
    }
}

#[cfg(feature = "cuda")]
fn create_gpu_backend(gpu: &GpuSettings) -> Result<Box<dyn StepBackend>> {
    Ok(Box::new(CudaBackend::new(gpu)?))
}

#[cfg(not(feature = "cuda"))]
fn create_gpu_backend(_gpu: &GpuSettings) -> Result<Box<dyn StepBackend>> {
    Err(RuntimeError::DeviceInitFailure(
        "CUDA support not compiled. Rebuild with --features cuda".to_string(),
    ))
}
