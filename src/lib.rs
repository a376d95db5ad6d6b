// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ARTI - spiking neural simulation core
//!
//! Umbrella crate re-exporting the simulation core, configuration and logging
//! crates, plus the glue that turns an `arti_configuration.toml` into runtime
//! settings.
//!
//! ## Feature Flags
//! - **`cuda`**: CUDA offload for node and synapse steps
//! - **`file-logging`**: Daily-rotated JSON log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arti_neural::prelude::*;
//!
//! let config = arti_neural::config::load_config_or_default(None).unwrap();
//! let mut registry = arti_neural::build_registry(&config).unwrap();
//!
//! let mut cortex = NodeArray::new(&mut registry, NodeVariant::RegularSpiking.parameters()).unwrap();
//! let ids = cortex.add_units(&mut registry, ["n0", "n1", "n2"]).unwrap();
//!
//! for _ in 0..100 {
//!     cortex.add_input(0, 10.0).unwrap();
//!     let report = cortex.step().unwrap();
//!     cortex.reset_input();
//!     println!("{} spikes via {}", report.spikes, report.strategy);
//! }
//! # let _ = ids;
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use arti_config as config;
pub use arti_npu_neural as neural;
pub use arti_npu_runtime as runtime;
pub use arti_observability as observability;

mod settings;

pub use settings::{build_registry, execution_settings, logging_settings};

/// Commonly used types
pub mod prelude {
    pub use arti_npu_neural::{
        ArrayId, EquationFamily, IzhikevichParameters, NodeId, NodeVariant, StpParameters,
        SynapseId,
    };
    pub use arti_npu_runtime::{
        ExecutionSettings, ExecutionStrategy, NodeArray, NodeRegistry, RuntimeError, StepReport,
        SynapseArray, SynapseStepReport,
    };
}
