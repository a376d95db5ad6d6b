// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Synapse state array
//!
//! Short-term plasticity between registered units. A step runs in three
//! phases:
//! 1. resolve every pre/post identity through the registry and gather the
//!    presynaptic spike flags
//! 2. run the plasticity kernel through the registry's strategy
//! 3. deliver `weight × release` with [`NodeArray::add_input`], in synapse order
//!
//! Resolution happens before anything is written, so an unknown identity or
//! a missing array leaves every synapse and node untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use arti_npu_neural::{ArrayId, NodeId, StpParameters, SynapseId};
use tracing::{debug, trace};

use crate::backend::SynapseState;
use crate::error::{check_index, Result, RuntimeError};
use crate::node_array::NodeArray;
use crate::registry::{ExecutionContext, NodeRegistry};

/// Outcome of one [`SynapseArray::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapseStepReport {
    pub synapses: usize,
    /// Synapses whose presynaptic unit fired
    pub releases: usize,
    /// Sum of current handed to postsynaptic units
    pub delivered: f32,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct SynapseArray {
    next_id: u64,
    ids: Vec<SynapseId>,
    pre: Vec<NodeId>,
    post: Vec<NodeId>,
    weight: Vec<f32>,
    /// Use increment
    big_u: Vec<f32>,
    /// Utilisation
    u: Vec<f32>,
    /// Available resources
    x: Vec<f32>,
    tf: Vec<f32>,
    td: Vec<f32>,
    /// Fraction released on the last step
    release: Vec<f32>,
    /// Presynaptic spike flags gathered for the current step
    pre_spike: Vec<f32>,

    context: Arc<ExecutionContext>,
}

impl SynapseArray {
    pub fn new(registry: &NodeRegistry) -> Self {
        Self {
            next_id: 0,
            ids: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
            weight: Vec::new(),
            big_u: Vec::new(),
            u: Vec::new(),
            x: Vec::new(),
            tf: Vec::new(),
            td: Vec::new(),
            release: Vec::new(),
            pre_spike: Vec::new(),
            context: Arc::clone(registry.context()),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Connect two registered units; starts at `u = U`, `x = 1`
    pub fn add_synapse(
        &mut self,
        registry: &NodeRegistry,
        pre: NodeId,
        post: NodeId,
        params: StpParameters,
    ) -> Result<SynapseId> {
        self.check_registry(registry)?;
        params.validate()?;
        registry.lookup(pre)?;
        registry.lookup(post)?;

        let id = SynapseId(self.next_id);
        self.next_id += 1;
        self.ids.push(id);
        self.pre.push(pre);
        self.post.push(post);
        self.weight.push(params.weight);
        self.big_u.push(params.big_u);
        self.u.push(params.big_u);
        self.x.push(1.0);
        self.tf.push(params.tf);
        self.td.push(params.td);
        self.release.push(0.0);
        self.pre_spike.push(0.0);
        Ok(id)
    }

    /// Delete a slot, shifting later synapses down
    pub fn remove_synapse(&mut self, slot: usize) -> Result<SynapseId> {
        check_index(slot, self.len())?;
        Ok(self.remove_slot(slot))
    }

    /// `slot` must be in range
    fn remove_slot(&mut self, slot: usize) -> SynapseId {
        let id = self.ids.remove(slot);
        self.pre.remove(slot);
        self.post.remove(slot);
        self.weight.remove(slot);
        self.big_u.remove(slot);
        self.u.remove(slot);
        self.x.remove(slot);
        self.tf.remove(slot);
        self.td.remove(slot);
        self.release.remove(slot);
        self.pre_spike.remove(slot);
        id
    }

    /// Drop every synapse touching `node`, returns how many were removed
    pub fn remove_synapses_of(&mut self, node: NodeId) -> usize {
        let mut removed = 0;
        let mut slot = 0;
        while slot < self.len() {
            if self.pre[slot] == node || self.post[slot] == node {
                self.remove_slot(slot);
                removed += 1;
            } else {
                slot += 1;
            }
        }
        if removed > 0 {
            debug!(target: "arti-npu-runtime", "Removed {} synapses of {}", removed, node);
        }
        removed
    }

    fn check_registry(&self, registry: &NodeRegistry) -> Result<()> {
        if Arc::ptr_eq(&self.context, registry.context()) {
            Ok(())
        } else {
            Err(RuntimeError::RegistryMismatch)
        }
    }

    /// Back to `u = U`, `x = 1`, no release
    pub fn reset_all(&mut self) {
        self.u.copy_from_slice(&self.big_u);
        self.x.fill(1.0);
        self.release.fill(0.0);
    }

    /// Advance every synapse one tick and deliver current to postsynaptic units
    pub fn step(&mut self, registry: &NodeRegistry, arrays: &mut [NodeArray]) -> Result<SynapseStepReport> {
        let start = Instant::now();
        self.check_registry(registry)?;

        let index: AHashMap<ArrayId, usize> = arrays
            .iter()
            .enumerate()
            .map(|(i, array)| (array.id(), i))
            .collect();
        let resolve = |node: NodeId| -> Result<(usize, usize)> {
            let record = registry.lookup(node)?;
            let array = *index
                .get(&record.array)
                .ok_or(RuntimeError::ArrayNotFound(record.array))?;
            check_index(record.slot, arrays[array].len())?;
            Ok((array, record.slot))
        };

        let mut targets = Vec::with_capacity(self.len());
        for k in 0..self.len() {
            let (array, slot) = resolve(self.pre[k])?;
            self.pre_spike[k] = arrays[array].spike(slot)?;
            targets.push(resolve(self.post[k])?);
        }

        let plan = self.context.plan();
        self.context.backend().step_synapses(
            &plan,
            SynapseState {
                pre_spike: &self.pre_spike,
                big_u: &self.big_u,
                tf: &self.tf,
                td: &self.td,
                u: &mut self.u,
                x: &mut self.x,
                release: &mut self.release,
            },
        )?;

        let mut releases = 0;
        let mut delivered = 0.0;
        for (k, &(array, slot)) in targets.iter().enumerate() {
            if self.release[k] > 0.0 {
                let current = self.weight[k] * self.release[k];
                arrays[array].add_input(slot, current)?;
                releases += 1;
                delivered += current;
            }
        }

        let report = SynapseStepReport {
            synapses: self.len(),
            releases,
            delivered,
            elapsed: start.elapsed(),
        };
        trace!(
            target: "arti-npu-runtime",
            "Stepped {} synapses, {} released in {:?}",
            report.synapses, report.releases, report.elapsed
        );
        Ok(report)
    }

    pub fn synapse_id(&self, slot: usize) -> Result<SynapseId> {
        check_index(slot, self.len())?;
        Ok(self.ids[slot])
    }

    pub fn slot_of(&self, id: SynapseId) -> Option<usize> {
        self.ids.iter().position(|&s| s == id)
    }

    pub fn pre(&self, slot: usize) -> Result<NodeId> {
        check_index(slot, self.len())?;
        Ok(self.pre[slot])
    }

    pub fn post(&self, slot: usize) -> Result<NodeId> {
        check_index(slot, self.len())?;
        Ok(self.post[slot])
    }

    pub fn weight(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.weight[slot])
    }

    pub fn big_u(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.big_u[slot])
    }

    pub fn u(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.u[slot])
    }

    pub fn x(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.x[slot])
    }

    pub fn release(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.release[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SingleThreadedBackend;
    use crate::registry::ExecutionSettings;
    use arti_npu_neural::NodeVariant;

    fn registry() -> NodeRegistry {
        NodeRegistry::with_backend(
            ExecutionSettings::default(),
            Box::new(SingleThreadedBackend::new()),
        )
    }

    #[test]
    fn test_add_synapse_requires_registered_nodes() {
        let mut reg = registry();
        let mut nodes = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let a = nodes.add_unit(&mut reg, "a").unwrap();
        let mut syn = SynapseArray::new(&reg);

        assert_eq!(
            syn.add_synapse(&reg, a, NodeId(42), StpParameters::default()),
            Err(RuntimeError::IdentityNotFound(NodeId(42)))
        );
        assert!(syn
            .add_synapse(&reg, a, a, StpParameters::new(2.0, 1.0, 1.0, 1.0))
            .is_err());
        assert!(syn.is_empty());

        let id = syn.add_synapse(&reg, a, a, StpParameters::default()).unwrap();
        assert_eq!(syn.slot_of(id), Some(0));
        assert_eq!(syn.u(0).unwrap(), 0.5);
        assert_eq!(syn.x(0).unwrap(), 1.0);
    }

    #[test]
    fn test_release_delivered_to_post_array() {
        let mut reg = registry();
        let mut pre = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let mut post = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let a = pre.add_unit(&mut reg, "pre").unwrap();
        let b = post.add_unit(&mut reg, "post").unwrap();

        let mut syn = SynapseArray::new(&reg);
        syn.add_synapse(&reg, a, b, StpParameters::new(0.5, 1.0, 20.0, 8.0)).unwrap();

        // force a presynaptic spike
        pre.set_state(0, 40.0, -13.0).unwrap();
        assert_eq!(pre.step().unwrap().spikes, 1);

        let mut arrays = [pre, post];
        let report = syn.step(&reg, &mut arrays).unwrap();
        assert_eq!(report.releases, 1);
        assert!((syn.release(0).unwrap() - 0.5).abs() < 1e-6);
        assert!((arrays[1].input(0).unwrap() - 4.0).abs() < 1e-6);
        assert_eq!(arrays[0].input(0).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_array_leaves_state_untouched() {
        let mut reg = registry();
        let mut pre = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let mut post = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let a = pre.add_unit(&mut reg, "").unwrap();
        let b = post.add_unit(&mut reg, "").unwrap();
        let mut syn = SynapseArray::new(&reg);
        syn.add_synapse(&reg, a, b, StpParameters::new(0.2, 3.0, 3.0, 1.0)).unwrap();
        syn.x[0] = 0.4;

        let post_id = post.id();
        let mut only_pre = [pre];
        assert_eq!(
            syn.step(&reg, &mut only_pre),
            Err(RuntimeError::ArrayNotFound(post_id))
        );
        assert_eq!(syn.x(0).unwrap(), 0.4);
    }

    #[test]
    fn test_stale_post_slot_leaves_state_untouched() {
        let mut reg = registry();
        let mut nodes = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let ids = nodes.add_units(&mut reg, ["a", "b"]).unwrap();
        let mut syn = SynapseArray::new(&reg);
        syn.add_synapse(&reg, ids[0], ids[1], StpParameters::new(0.5, 1.0, 20.0, 8.0)).unwrap();

        nodes.set_state(0, 40.0, -13.0).unwrap();
        nodes.step().unwrap();
        reg.set_slot_index(ids[1], 7).unwrap();

        let mut arrays = [nodes];
        assert_eq!(
            syn.step(&reg, &mut arrays),
            Err(RuntimeError::IndexOutOfRange { index: 7, len: 2 })
        );
        assert_eq!(syn.u(0).unwrap(), 0.5);
        assert_eq!(syn.x(0).unwrap(), 1.0);
        assert_eq!(syn.release(0).unwrap(), 0.0);
        assert_eq!(arrays[0].input(1).unwrap(), 0.0);
    }

    #[test]
    fn test_step_rejects_foreign_registry() {
        let mut reg = registry();
        let other = registry();
        let mut nodes = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
        let a = nodes.add_unit(&mut reg, "").unwrap();
        let mut syn = SynapseArray::new(&reg);
        syn.add_synapse(&reg, a, a, StpParameters::default()).unwrap();

        let mut arrays = [nodes];
        assert_eq!(syn.step(&other, &mut arrays), Err(RuntimeError::RegistryMismatch));
        assert_eq!(syn.u(0).unwrap(), 0.5);
    }

    #[test]
    fn test_remove_synapses_of_node() {
        let mut reg = registry();
        let mut nodes = NodeArray::new(&mut reg, NodeVariant::FastSpiking.parameters()).unwrap();
        let ids = nodes.add_units(&mut reg, ["a", "b", "c"]).unwrap();
        let mut syn = SynapseArray::new(&reg);
        let p = StpParameters::default();
        syn.add_synapse(&reg, ids[0], ids[1], p).unwrap();
        syn.add_synapse(&reg, ids[1], ids[2], p).unwrap();
        let keep = syn.add_synapse(&reg, ids[2], ids[0], p).unwrap();

        assert_eq!(syn.remove_synapses_of(ids[1]), 2);
        assert_eq!(syn.len(), 1);
        assert_eq!(syn.synapse_id(0).unwrap(), keep);
        assert!(syn.remove_synapse(1).is_err());
    }

    #[test]
    fn test_reset_all() {
        let mut reg = registry();
        let mut nodes = NodeArray::new(&mut reg, NodeVariant::FastSpiking.parameters()).unwrap();
        let a = nodes.add_unit(&mut reg, "").unwrap();
        let mut syn = SynapseArray::new(&reg);
        syn.add_synapse(&reg, a, a, StpParameters::new(0.3, 2.0, 2.0, 1.0)).unwrap();
        syn.u[0] = 0.9;
        syn.x[0] = 0.1;
        syn.reset_all();
        assert_eq!(syn.u(0).unwrap(), 0.3);
        assert_eq!(syn.x(0).unwrap(), 1.0);
    }
}
