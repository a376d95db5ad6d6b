// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Multi-threaded backend.
//!
//! Each worker steps an owned copy of its batch and sends it back over a
//! channel. The caller steps the remainder, then waits for every batch until
//! the worker timeout. Results are committed only when all batches arrived,
//! so a timed-out step leaves the array exactly as it was.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arti_npu_neural::{step_range, stp_range, IzhikevichParameters};
use crossbeam::channel::{self, RecvTimeoutError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{error, trace, warn};

use super::{DispatchPlan, ExecutionStrategy, NodeState, StepBackend, SynapseState};
use crate::error::{Result, RuntimeError};

/// Units a worker steps between cancellation checks
const CANCEL_CHECK_UNITS: usize = 4096;

/// State that can be copied out in batches and written back
trait BatchSource {
    type Batch: Send + 'static;

    fn extract(&self, range: Range<usize>) -> Self::Batch;
    fn commit(&mut self, range: Range<usize>, batch: Self::Batch);
}

struct NodeBatch {
    input: Vec<f32>,
    u: Vec<f32>,
    v: Vec<f32>,
    spike: Vec<f32>,
}

impl BatchSource for NodeState<'_> {
    type Batch = NodeBatch;

    fn extract(&self, range: Range<usize>) -> NodeBatch {
        NodeBatch {
            spike: vec![0.0; range.len()],
            input: self.input[range.clone()].to_vec(),
            u: self.u[range.clone()].to_vec(),
            v: self.v[range].to_vec(),
        }
    }

    fn commit(&mut self, range: Range<usize>, batch: NodeBatch) {
        self.u[range.clone()].copy_from_slice(&batch.u);
        self.v[range.clone()].copy_from_slice(&batch.v);
        self.spike[range].copy_from_slice(&batch.spike);
    }
}

struct SynapseBatch {
    pre_spike: Vec<f32>,
    big_u: Vec<f32>,
    tf: Vec<f32>,
    td: Vec<f32>,
    u: Vec<f32>,
    x: Vec<f32>,
    release: Vec<f32>,
}

impl BatchSource for SynapseState<'_> {
    type Batch = SynapseBatch;

    fn extract(&self, range: Range<usize>) -> SynapseBatch {
        SynapseBatch {
            release: vec![0.0; range.len()],
            pre_spike: self.pre_spike[range.clone()].to_vec(),
            big_u: self.big_u[range.clone()].to_vec(),
            tf: self.tf[range.clone()].to_vec(),
            td: self.td[range.clone()].to_vec(),
            u: self.u[range.clone()].to_vec(),
            x: self.x[range].to_vec(),
        }
    }

    fn commit(&mut self, range: Range<usize>, batch: SynapseBatch) {
        self.u[range.clone()].copy_from_slice(&batch.u);
        self.x[range.clone()].copy_from_slice(&batch.x);
        self.release[range].copy_from_slice(&batch.release);
    }
}

fn node_kernel(
    params: IzhikevichParameters,
) -> impl Fn(&mut NodeBatch, Range<usize>) + Clone + Send + 'static {
    move |b: &mut NodeBatch, r: Range<usize>| {
        step_range(
            &params,
            &b.input[r.clone()],
            &mut b.u[r.clone()],
            &mut b.v[r.clone()],
            &mut b.spike[r],
        )
    }
}

fn synapse_kernel(b: &mut SynapseBatch, r: Range<usize>) {
    stp_range(
        &b.pre_spike[r.clone()],
        &b.big_u[r.clone()],
        &b.tf[r.clone()],
        &b.td[r.clone()],
        &mut b.u[r.clone()],
        &mut b.x[r.clone()],
        &mut b.release[r],
    )
}

/// Multi-threaded CPU backend with a bounded wait
pub struct ThreadedBackend {
    name: String,
    pool: ThreadPool,
    batch_delay: Option<Duration>,
}

impl ThreadedBackend {
    /// Build a pool of `threads` workers
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("arti-step-{}", i))
            .panic_handler(|_| error!(target: "arti-npu-runtime", "Step worker panicked"))
            .build()
            .map_err(|e| RuntimeError::WorkerFailure(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            name: format!("CPU (multi-threaded, {} workers)", threads),
            pool,
            batch_delay: None,
        })
    }

    /// Stall every worker batch before it starts (test harness hook)
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    fn run_batches<S, K>(&self, plan: &DispatchPlan, state: &mut S, units: usize, kernel: K) -> Result<()>
    where
        S: BatchSource,
        K: Fn(&mut S::Batch, Range<usize>) + Clone + Send + 'static,
    {
        if units == 0 {
            return Ok(());
        }

        let partition = plan.partition(units);
        let remainder = partition.remainder_start()..units;

        if partition.batch == 0 {
            let mut batch = state.extract(remainder.clone());
            kernel(&mut batch, 0..remainder.len());
            state.commit(remainder, batch);
            return Ok(());
        }

        let (tx, rx) = channel::bounded(partition.threads);
        let cancel = Arc::new(AtomicBool::new(false));

        for index in 0..partition.threads {
            let mut batch = state.extract(partition.batch_range(index));
            let len = partition.batch;
            let tx = tx.clone();
            let cancel = Arc::clone(&cancel);
            let kernel = kernel.clone();
            let delay = self.batch_delay;

            self.pool.spawn(move || {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                let mut start = 0;
                while start < len {
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    let end = (start + CANCEL_CHECK_UNITS).min(len);
                    kernel(&mut batch, start..end);
                    start = end;
                }
                // receiver is gone after a timeout
                let _ = tx.send((index, batch));
            });
        }
        drop(tx);

        let deadline = Instant::now() + plan.worker_timeout;

        let mut tail = state.extract(remainder.clone());
        kernel(&mut tail, 0..remainder.len());

        let mut results: Vec<Option<S::Batch>> = (0..partition.threads).map(|_| None).collect();
        let mut received = 0;
        while received < partition.threads {
            match rx.recv_deadline(deadline) {
                Ok((index, batch)) => {
                    results[index] = Some(batch);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    cancel.store(true, Ordering::Relaxed);
                    let pending = partition.threads - received;
                    warn!(
                        target: "arti-npu-runtime",
                        "Worker timeout after {:?}: {} of {} batches pending, step discarded",
                        plan.worker_timeout, pending, partition.threads
                    );
                    return Err(RuntimeError::WorkerTimeout {
                        timeout_ms: plan.worker_timeout.as_millis() as u64,
                        pending_batches: pending,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(RuntimeError::WorkerFailure(format!(
                        "{} batches lost (worker exited without reporting)",
                        partition.threads - received
                    )));
                }
            }
        }

        for (index, batch) in results.into_iter().enumerate() {
            if let Some(batch) = batch {
                state.commit(partition.batch_range(index), batch);
            }
        }
        state.commit(remainder, tail);

        trace!(
            target: "arti-npu-runtime",
            "Stepped {} units in {} batches of {}",
            units, partition.threads, partition.batch
        );
        Ok(())
    }
}

impl StepBackend for ThreadedBackend {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::MultiThreaded
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
        mut state: NodeState<'_>,
    ) -> Result<()> {
        state.check_lengths()?;
        let units = state.len();
        self.run_batches(plan, &mut state, units, node_kernel(*params))
    }

    fn step_synapses(&self, plan: &DispatchPlan, mut state: SynapseState<'_>) -> Result<()> {
        state.check_lengths()?;
        let units = state.len();
        self.run_batches(plan, &mut state, units, synapse_kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arti_npu_neural::NodeVariant;

    fn plan(timeout_ms: u64) -> DispatchPlan {
        DispatchPlan {
            max_threads: 3,
            units_per_thread: 10,
            worker_timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_batches_match_reference() {
        let params = NodeVariant::Chattering.parameters();
        let n = 47;
        let input: Vec<f32> = (0..n).map(|i| i as f32 * 0.5).collect();
        let (mut u1, mut v1, mut s1) = (vec![params.u_init; n], vec![params.v_init; n], vec![0.0; n]);
        let (mut u2, mut v2, mut s2) = (u1.clone(), v1.clone(), s1.clone());

        let backend = ThreadedBackend::new(3).unwrap();
        for _ in 0..25 {
            step_range(&params, &input, &mut u1, &mut v1, &mut s1);
            backend
                .step_nodes(
                    &plan(5_000),
                    &params,
                    NodeState { input: &input, u: &mut u2, v: &mut v2, spike: &mut s2 },
                )
                .unwrap();
        }
        assert_eq!(u1, u2);
        assert_eq!(v1, v2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_timeout_commits_nothing() {
        let params = NodeVariant::RegularSpiking.parameters();
        let n = 40;
        let input = vec![15.0f32; n];
        let mut u = vec![params.u_init; n];
        let mut v = vec![params.v_init; n];
        let mut spike = vec![0.0f32; n];

        let backend = ThreadedBackend::new(3)
            .unwrap()
            .with_batch_delay(Duration::from_millis(300));
        let err = backend
            .step_nodes(
                &plan(20),
                &params,
                NodeState { input: &input, u: &mut u, v: &mut v, spike: &mut spike },
            )
            .unwrap_err();

        assert!(matches!(err, RuntimeError::WorkerTimeout { timeout_ms: 20, .. }));
        assert!(u.iter().all(|&x| x == params.u_init));
        assert!(v.iter().all(|&x| x == params.v_init));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let params = NodeVariant::RegularSpiking.parameters();
        let backend = ThreadedBackend::new(2).unwrap();
        let err = backend.step_nodes(
            &plan(100),
            &params,
            NodeState { input: &[0.0; 3], u: &mut [0.0; 2], v: &mut [0.0; 3], spike: &mut [0.0; 3] },
        );
        assert!(err.is_err());
    }
}
