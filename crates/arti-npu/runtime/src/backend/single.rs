// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Single-threaded backend: slot order on the calling thread.
//!
//! This is the reference every other strategy is compared against.

use arti_npu_neural::{step_range, stp_range, IzhikevichParameters};

use super::{DispatchPlan, ExecutionStrategy, NodeState, StepBackend, SynapseState};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct SingleThreadedBackend;

impl SingleThreadedBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StepBackend for SingleThreadedBackend {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::SingleThreaded
    }

    fn backend_name(&self) -> &str {
        "CPU (single-threaded)"
    }

    fn step_nodes(
        &self,
        _plan: &DispatchPlan,
        params: &IzhikevichParameters,
        state: NodeState<'_>,
    ) -> Result<()> {
        state.check_lengths()?;
        step_range(params, state.input, state.u, state.v, state.spike);
        Ok(())
    }

    fn step_synapses(&self, _plan: &DispatchPlan, state: SynapseState<'_>) -> Result<()> {
        state.check_lengths()?;
        stp_range(
            state.pre_spike,
            state.big_u,
            state.tf,
            state.td,
            state.u,
            state.x,
            state.release,
        );
        Ok(())
    }
}
