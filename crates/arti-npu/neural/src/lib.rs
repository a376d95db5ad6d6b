// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # ARTI Neural Computation (Platform-Agnostic)
//!
//! All per-unit math in one place:
//! - **Types**: identity handles (`NodeId`, `ArrayId`, `SynapseId`) and parameter errors
//! - **Models**: Izhikevich parameter sets, equation families and named presets
//! - **Dynamics**: scalar and fixed-width lane step kernels for node arrays
//! - **Plasticity**: short-term plasticity kernel for synapse arrays
//!
//! Nothing in this crate allocates per tick or touches threads; the runtime
//! crate decides how slices are partitioned and which kernel runs them.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod types;

pub mod models;

pub mod dynamics;
pub mod plasticity;

pub use types::{ArrayId, NodeId, ParameterError, Result, SynapseId};

pub use models::{EquationFamily, IzhikevichParameters, ModelParameters, NodeVariant};

pub use dynamics::{step_lanes, step_range, step_range_lanes, step_unit, LANES};

pub use plasticity::{stp_range, stp_range_lanes, stp_update, StpParameters};
