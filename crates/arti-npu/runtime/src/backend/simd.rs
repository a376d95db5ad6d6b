// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! SIMD backend.
//!
//! Same batching as the multi-threaded backend, but batches are stepped in
//! place with the lane kernel and the caller joins without a deadline.

use arti_npu_neural::{step_range_lanes, stp_range_lanes, IzhikevichParameters, LANES};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, trace};

use super::{DispatchPlan, ExecutionStrategy, NodeState, StepBackend, SynapseState};
use crate::error::{Result, RuntimeError};

/// Data-parallel CPU backend (LLVM auto-vectorized lane kernel)
pub struct SimdBackend {
    name: String,
    pool: ThreadPool,
}

impl SimdBackend {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("arti-simd-{}", i))
            .panic_handler(|_| error!(target: "arti-npu-runtime", "SIMD worker panicked"))
            .build()
            .map_err(|e| RuntimeError::WorkerFailure(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            name: format!("CPU (SIMD {} lanes, {} workers)", LANES, threads),
            pool,
        })
    }
}

impl StepBackend for SimdBackend {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Simd
    }

    fn backend_name(&self) -> &str {
        &self.name
    }

    fn worker_count(&self) -> Option<usize> {
        Some(self.pool.current_num_threads())
    }

    fn step_nodes(
        &self,
        plan: &DispatchPlan,
        params: &IzhikevichParameters,
        state: NodeState<'_>,
    ) -> Result<()> {
        state.check_lengths()?;
        let units = state.len();
        if units == 0 {
            return Ok(());
        }

        let partition = plan.partition(units);
        if partition.batch == 0 {
            step_range_lanes(params, state.input, state.u, state.v, state.spike);
            return Ok(());
        }

        let split = partition.remainder_start();
        let batch = partition.batch;
        let (input, input_tail) = state.input.split_at(split);
        let (u, u_tail) = state.u.split_at_mut(split);
        let (v, v_tail) = state.v.split_at_mut(split);
        let (spike, spike_tail) = state.spike.split_at_mut(split);

        self.pool.in_place_scope(|scope| {
            for (((i, u), v), s) in input
                .chunks(batch)
                .zip(u.chunks_mut(batch))
                .zip(v.chunks_mut(batch))
                .zip(spike.chunks_mut(batch))
            {
                scope.spawn(move |_| step_range_lanes(params, i, u, v, s));
            }
            step_range_lanes(params, input_tail, u_tail, v_tail, spike_tail);
        });

        trace!(
            target: "arti-npu-runtime",
            "SIMD stepped {} units in {} batches of {}",
            units, partition.threads, batch
        );
        Ok(())
    }

    fn step_synapses(&self, plan: &DispatchPlan, state: SynapseState<'_>) -> Result<()> {
        state.check_lengths()?;
        let units = state.len();
        if units == 0 {
            return Ok(());
        }

        let partition = plan.partition(units);
        let split = partition.remainder_start();
        let batch = partition.batch.max(1);

        let (pre, pre_tail) = state.pre_spike.split_at(split);
        let (big_u, big_u_tail) = state.big_u.split_at(split);
        let (tf, tf_tail) = state.tf.split_at(split);
        let (td, td_tail) = state.td.split_at(split);
        let (u, u_tail) = state.u.split_at_mut(split);
        let (x, x_tail) = state.x.split_at_mut(split);
        let (release, release_tail) = state.release.split_at_mut(split);

        self.pool.in_place_scope(|scope| {
            for (((((pre, big_u), tf), td), (u, x)), release) in pre
                .chunks(batch)
                .zip(big_u.chunks(batch))
                .zip(tf.chunks(batch))
                .zip(td.chunks(batch))
                .zip(u.chunks_mut(batch).zip(x.chunks_mut(batch)))
                .zip(release.chunks_mut(batch))
            {
                scope.spawn(move |_| stp_range_lanes(pre, big_u, tf, td, u, x, release));
            }
            stp_range_lanes(pre_tail, big_u_tail, tf_tail, td_tail, u_tail, x_tail, release_tail);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arti_npu_neural::{step_range, stp_range, NodeVariant};
    use std::time::Duration;

    fn plan() -> DispatchPlan {
        DispatchPlan {
            max_threads: 4,
            units_per_thread: 16,
            worker_timeout: Duration::from_millis(800),
        }
    }

    #[test]
    fn test_nodes_match_reference() {
        let params = NodeVariant::RegularSpikingPyramidal.parameters();
        let n = 101;
        let input: Vec<f32> = (0..n).map(|i| (i % 13) as f32 * 60.0).collect();
        let (mut u1, mut v1, mut s1) = (vec![params.u_init; n], vec![params.v_init; n], vec![0.0; n]);
        let (mut u2, mut v2, mut s2) = (u1.clone(), v1.clone(), s1.clone());

        let backend = SimdBackend::new(4).unwrap();
        for _ in 0..30 {
            step_range(&params, &input, &mut u1, &mut v1, &mut s1);
            backend
                .step_nodes(
                    &plan(),
                    &params,
                    NodeState { input: &input, u: &mut u2, v: &mut v2, spike: &mut s2 },
                )
                .unwrap();
        }
        assert_eq!(u1, u2);
        assert_eq!(v1, v2);
        assert_eq!(s1, s2);
        assert!(s1.iter().any(|&s| s == 1.0) || v1.iter().any(|&v| v != params.v_init));
    }

    #[test]
    fn test_synapses_match_reference() {
        let n = 37;
        let pre: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        let big_u = vec![0.3f32; n];
        let tf = vec![5.0f32; n];
        let td = vec![12.0f32; n];
        let (mut u1, mut x1, mut r1) = (big_u.clone(), vec![1.0f32; n], vec![0.0f32; n]);
        let (mut u2, mut x2, mut r2) = (u1.clone(), x1.clone(), r1.clone());

        let backend = SimdBackend::new(4).unwrap();
        for _ in 0..4 {
            stp_range(&pre, &big_u, &tf, &td, &mut u1, &mut x1, &mut r1);
            backend
                .step_synapses(
                    &plan(),
                    SynapseState {
                        pre_spike: &pre,
                        big_u: &big_u,
                        tf: &tf,
                        td: &td,
                        u: &mut u2,
                        x: &mut x2,
                        release: &mut r2,
                    },
                )
                .unwrap();
        }
        assert_eq!(u1, u2);
        assert_eq!(x1, x2);
        assert_eq!(r1, r2);
    }
}
