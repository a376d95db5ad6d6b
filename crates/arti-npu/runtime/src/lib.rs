// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # ARTI Simulation Runtime
//!
//! Stateful half of the simulation core:
//! - **Registry**: stable [`NodeId`] handles mapped to `(array, slot, name)` records,
//!   the one-time hardware probe and the selected [`ExecutionStrategy`]
//! - **Node arrays**: structure-of-arrays state (`I`, `u`, `v`, `spike`) for units
//!   sharing one parameter set
//! - **Synapse arrays**: short-term plasticity state between registered units
//! - **Backends**: single-threaded, multi-threaded, SIMD and CUDA step strategies
//!
//! ## Features
//!
//! - `default` = `[]` (all CPU strategies)
//! - `cuda` = CUDA offload via `cudarc`
//!
//! ## Usage
//!
//! ```rust
//! use arti_npu_runtime::{ExecutionSettings, NodeArray, NodeRegistry};
//! use arti_npu_neural::NodeVariant;
//!
//! let mut registry = NodeRegistry::new(ExecutionSettings::default());
//! let mut array = NodeArray::new(&mut registry, NodeVariant::RegularSpiking.parameters()).unwrap();
//! let id = array.add_unit(&mut registry, "soma").unwrap();
//! let slot = registry.lookup(id).unwrap().slot;
//! array.add_input(slot, 10.0).unwrap();
//! let report = array.step().unwrap();
//! assert_eq!(report.units, 1);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod error;
pub mod node_array;
pub mod registry;
pub mod synapse_array;

pub use arti_npu_neural::{ArrayId, NodeId, SynapseId};
pub use backend::{
    create_backend, DispatchPlan, ExecutionStrategy, NodeState, Partition, SimdBackend,
    SingleThreadedBackend, StepBackend, SynapseState, ThreadedBackend,
};
#[cfg(feature = "cuda")]
pub use backend::{is_cuda_available, CudaBackend};
pub use error::{Result, RuntimeError};
pub use node_array::{NodeArray, StepReport};
pub use registry::{
    hardware_profile, ExecutionContext, ExecutionSettings, GpuSettings, HardwareProfile,
    NodeRecord, NodeRegistry,
};
pub use synapse_array::{SynapseArray, SynapseStepReport};
