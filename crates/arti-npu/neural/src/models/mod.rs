// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neuron Model Architecture
//!
//! A node array variant is plain data: one immutable [`IzhikevichParameters`]
//! value whose [`EquationFamily`] picks the membrane equation. Named variants
//! live in [`NodeVariant`].
//!
//! ## Adding a New Variant
//!
//! 1. Add a `NodeVariant` case and its constants in `variants.rs`
//! 2. Make sure `validate()` accepts it
//! 3. Add a resting-trajectory test

pub mod izhikevich;
pub mod traits;
pub mod variants;

pub use izhikevich::{EquationFamily, IzhikevichParameters};
pub use traits::ModelParameters;
pub use variants::NodeVariant;
