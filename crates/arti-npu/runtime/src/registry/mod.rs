// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Node Registry
//!
//! Maps stable [`NodeId`] handles to the `(array, slot, name)` record that
//! currently holds each unit, and owns the [`ExecutionContext`] every array
//! built against it shares.
//!
//! Identities are issued from a monotonic counter and never reused. The
//! registry is an explicit object: construct one per network (or per test)
//! and pass it to the arrays that need identity resolution. Structural
//! mutation is single-threaded by contract; nothing here is locked.

mod probe;
mod record;
mod settings;

pub use probe::{hardware_profile, HardwareProfile};
pub use record::NodeRecord;
pub use settings::{
    ExecutionSettings, GpuSettings, DEFAULT_BLOCK_SIZE, DEFAULT_UNITS_PER_THREAD,
    DEFAULT_WORKER_TIMEOUT,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use arti_npu_neural::{ArrayId, NodeId};
use tracing::{debug, info};

use crate::backend::{DispatchPlan, ExecutionStrategy, StepBackend};
use crate::error::{Result, RuntimeError};

/// Backend plus batching knobs, shared by a registry and its arrays
pub struct ExecutionContext {
    backend: Box<dyn StepBackend>,
    max_threads: usize,
    units_per_thread: AtomicUsize,
    worker_timeout: Duration,
}

impl ExecutionContext {
    fn new(backend: Box<dyn StepBackend>, max_threads: usize, settings: &ExecutionSettings) -> Self {
        Self {
            backend,
            max_threads: max_threads.max(1),
            units_per_thread: AtomicUsize::new(settings.units_per_thread.max(1)),
            worker_timeout: settings.worker_timeout,
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.backend.strategy()
    }

    pub fn backend(&self) -> &dyn StepBackend {
        self.backend.as_ref()
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn units_per_thread(&self) -> usize {
        self.units_per_thread.load(Ordering::Relaxed)
    }

    pub fn worker_timeout(&self) -> Duration {
        self.worker_timeout
    }

    /// Snapshot of the batching knobs for one step
    pub fn plan(&self) -> DispatchPlan {
        DispatchPlan {
            max_threads: self.max_threads,
            units_per_thread: self.units_per_thread(),
            worker_timeout: self.worker_timeout,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("backend", &self.backend.backend_name())
            .field("max_threads", &self.max_threads)
            .field("units_per_thread", &self.units_per_thread())
            .field("worker_timeout", &self.worker_timeout)
            .finish()
    }
}

/// Identity table and execution strategy for one network
#[derive(Debug)]
pub struct NodeRegistry {
    records: AHashMap<NodeId, NodeRecord>,
    next_node: u64,
    next_array: u32,
    context: Arc<ExecutionContext>,
}

impl NodeRegistry {
    /// Probe hardware (once per process) and select the execution strategy
    pub fn new(settings: ExecutionSettings) -> Self {
        let hardware = hardware_profile();
        let max_threads = if settings.max_threads > 0 {
            settings.max_threads
        } else {
            hardware.default_max_threads()
        };
        let backend = probe::select_backend(&settings, max_threads, hardware);
        Self::with_backend(settings.with_max_threads(max_threads), backend)
    }

    /// Use `backend` as-is, skipping the probe.
    ///
    /// `max_threads` is clamped to the backend's worker pool so a step never
    /// plans more batches than there are workers to run them.
    pub fn with_backend(settings: ExecutionSettings, backend: Box<dyn StepBackend>) -> Self {
        let requested = if settings.max_threads > 0 {
            settings.max_threads
        } else {
            hardware_profile().default_max_threads()
        };
        let max_threads = match backend.worker_count() {
            Some(workers) => requested.min(workers.max(1)),
            None => requested,
        };
        info!(
            target: "arti-npu-runtime",
            "Node registry ready: {} strategy ({}), {} max threads, {} units/thread",
            backend.strategy(),
            backend.backend_name(),
            max_threads,
            settings.units_per_thread.max(1)
        );
        Self {
            records: AHashMap::new(),
            next_node: 0,
            next_array: 0,
            context: Arc::new(ExecutionContext::new(backend, max_threads, &settings)),
        }
    }

    /// Allocate the next identity and record where it lives
    pub fn register(&mut self, array: ArrayId, slot: usize, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.records.insert(id, NodeRecord::new(array, slot, name));
        id
    }

    /// Delete a record, returning it if it existed.
    ///
    /// Links from other records to `id` are cleared.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeRecord> {
        let record = self.records.remove(&id)?;
        for other in self.records.values_mut() {
            other.unlink(id);
        }
        debug!(target: "arti-npu-runtime", "Removed {} from {} slot {}", id, record.array, record.slot);
        Some(record)
    }

    pub fn lookup(&self, id: NodeId) -> Result<&NodeRecord> {
        self.records.get(&id).ok_or(RuntimeError::IdentityNotFound(id))
    }

    fn record_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord> {
        self.records.get_mut(&id).ok_or(RuntimeError::IdentityNotFound(id))
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.record_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_slot_index(&mut self, id: NodeId, slot: usize) -> Result<()> {
        self.record_mut(id)?.slot = slot;
        Ok(())
    }

    fn check_link(&self, target: Option<NodeId>) -> Result<()> {
        match target {
            Some(t) if !self.records.contains_key(&t) => Err(RuntimeError::IdentityNotFound(t)),
            _ => Ok(()),
        }
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.check_link(parent)?;
        self.record_mut(id)?.parent = parent;
        Ok(())
    }

    pub fn set_left_child(&mut self, id: NodeId, child: Option<NodeId>) -> Result<()> {
        self.check_link(child)?;
        self.record_mut(id)?.child_left = child;
        Ok(())
    }

    pub fn set_right_child(&mut self, id: NodeId, child: Option<NodeId>) -> Result<()> {
        self.check_link(child)?;
        self.record_mut(id)?.child_right = child;
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered identities in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Strategy fixed at construction
    pub fn selected_strategy(&self) -> ExecutionStrategy {
        self.context.strategy()
    }

    pub fn backend_name(&self) -> &str {
        self.context.backend().backend_name()
    }

    pub fn max_threads(&self) -> usize {
        self.context.max_threads()
    }

    pub fn units_per_thread(&self) -> usize {
        self.context.units_per_thread()
    }

    /// Takes effect on the next step of every array sharing this registry
    pub fn set_units_per_thread(&self, units: usize) {
        self.context
            .units_per_thread
            .store(units.max(1), Ordering::Relaxed);
    }

    pub fn worker_timeout(&self) -> Duration {
        self.context.worker_timeout()
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    pub(crate) fn allocate_array_id(&mut self) -> ArrayId {
        let id = ArrayId(self.next_array);
        self.next_array += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SingleThreadedBackend, ThreadedBackend};

    fn registry() -> NodeRegistry {
        NodeRegistry::with_backend(
            ExecutionSettings::default(),
            Box::new(SingleThreadedBackend::new()),
        )
    }

    #[test]
    fn test_identities_are_monotonic_and_never_reused() {
        let mut reg = registry();
        let a = reg.register(ArrayId(0), 0, "a");
        let b = reg.register(ArrayId(0), 1, "");
        assert_eq!((a, b), (NodeId(0), NodeId(1)));

        assert!(reg.remove(b).is_some());
        assert!(reg.remove(b).is_none());
        let c = reg.register(ArrayId(0), 1, "c");
        assert_eq!(c, NodeId(2));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_unknown_identity_errors() {
        let mut reg = registry();
        let ghost = NodeId(99);
        assert_eq!(reg.lookup(ghost), Err(RuntimeError::IdentityNotFound(ghost)));
        assert!(reg.rename(ghost, "x").is_err());
        assert!(reg.set_slot_index(ghost, 3).is_err());
    }

    #[test]
    fn test_rename_and_slot_update() {
        let mut reg = registry();
        let id = reg.register(ArrayId(2), 5, "dendrite");
        reg.rename(id, "axon").unwrap();
        reg.set_slot_index(id, 4).unwrap();
        let rec = reg.lookup(id).unwrap();
        assert_eq!(rec.name, "axon");
        assert_eq!(rec.slot, 4);
        assert_eq!(rec.array, ArrayId(2));
    }

    #[test]
    fn test_compartment_links_cleared_on_remove() {
        let mut reg = registry();
        let soma = reg.register(ArrayId(0), 0, "soma");
        let left = reg.register(ArrayId(1), 0, "left");
        let right = reg.register(ArrayId(1), 1, "right");

        reg.set_left_child(soma, Some(left)).unwrap();
        reg.set_right_child(soma, Some(right)).unwrap();
        reg.set_parent(left, Some(soma)).unwrap();
        assert_eq!(
            reg.set_parent(right, Some(NodeId(77))),
            Err(RuntimeError::IdentityNotFound(NodeId(77)))
        );

        reg.remove(left);
        let rec = reg.lookup(soma).unwrap();
        assert_eq!(rec.child_left, None);
        assert_eq!(rec.child_right, Some(right));
    }

    #[test]
    fn test_units_per_thread_clamped() {
        let reg = registry();
        assert_eq!(reg.units_per_thread(), DEFAULT_UNITS_PER_THREAD);
        reg.set_units_per_thread(0);
        assert_eq!(reg.units_per_thread(), 1);
        assert_eq!(reg.context().plan().units_per_thread, 1);
    }

    #[test]
    fn test_strategy_is_stable() {
        let reg = NodeRegistry::new(ExecutionSettings::default());
        let first = reg.selected_strategy();
        for _ in 0..10 {
            assert_eq!(reg.selected_strategy(), first);
        }
        assert!(reg.max_threads() >= 1);
    }

    #[test]
    fn test_max_threads_override() {
        let reg = NodeRegistry::with_backend(
            ExecutionSettings::default().with_max_threads(3),
            Box::new(SingleThreadedBackend::new()),
        );
        assert_eq!(reg.max_threads(), 3);
    }

    #[test]
    fn test_max_threads_clamped_to_worker_pool() {
        let reg = NodeRegistry::with_backend(
            ExecutionSettings::default().with_max_threads(8),
            Box::new(ThreadedBackend::new(2).unwrap()),
        );
        assert_eq!(reg.max_threads(), 2);
        assert_eq!(reg.context().plan().max_threads, 2);
    }
}
