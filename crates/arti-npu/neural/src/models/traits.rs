// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared behaviour of model parameter sets

use crate::types::Result;

/// A parameter set that can check itself before any array is built from it
pub trait ModelParameters: Copy + Send + Sync + 'static {
    /// Reject values the step kernels cannot integrate
    fn validate(&self) -> Result<()>;

    /// Number of scalar constants the set carries
    fn parameter_count() -> usize;
}
