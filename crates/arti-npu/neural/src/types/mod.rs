// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions shared by every ARTI crate

pub mod error;
pub mod ids;

pub use error::{ParameterError, Result};
pub use ids::{ArrayId, NodeId, SynapseId};
