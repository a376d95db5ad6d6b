// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Node state array
//!
//! Units sharing one parameter set, stored as parallel `Vec`s indexed by
//! slot. Every structural change goes through the registry in the same call,
//! so a record's slot always points at the unit it names.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arti_npu_neural::{ArrayId, IzhikevichParameters, ModelParameters, NodeId};
use tracing::{debug, trace};

use crate::backend::{ExecutionStrategy, NodeState};
use crate::error::{check_index, Result, RuntimeError};
use crate::registry::{ExecutionContext, NodeRegistry};

/// Outcome of one [`NodeArray::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub units: usize,
    pub spikes: usize,
    pub strategy: ExecutionStrategy,
    pub elapsed: Duration,
}

/// Homogeneous array of units stepped by the registry's strategy
#[derive(Debug)]
pub struct NodeArray {
    id: ArrayId,
    params: IzhikevichParameters,

    /// Input current, accumulated until reset
    input: Vec<f32>,
    /// Recovery variable
    u: Vec<f32>,
    /// Membrane potential
    v: Vec<f32>,
    /// 1.0 if the unit fired on the last step
    spike: Vec<f32>,
    /// Slot to identity
    nodes: Vec<NodeId>,

    context: Arc<ExecutionContext>,
}

impl NodeArray {
    /// Create an empty array; rejects parameters the equations cannot handle
    pub fn new(registry: &mut NodeRegistry, params: IzhikevichParameters) -> Result<Self> {
        params.validate()?;
        let id = registry.allocate_array_id();
        debug!(target: "arti-npu-runtime", "Created {} ({:?} family)", id, params.family);
        Ok(Self {
            id,
            params,
            input: Vec::new(),
            u: Vec::new(),
            v: Vec::new(),
            spike: Vec::new(),
            nodes: Vec::new(),
            context: Arc::clone(registry.context()),
        })
    }

    pub fn id(&self) -> ArrayId {
        self.id
    }

    pub fn parameters(&self) -> &IzhikevichParameters {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fails with `RegistryMismatch` unless `registry` built this array
    fn check_registry(&self, registry: &NodeRegistry) -> Result<()> {
        if Arc::ptr_eq(&self.context, registry.context()) {
            Ok(())
        } else {
            Err(RuntimeError::RegistryMismatch)
        }
    }

    /// Append a fully initialised slot and register it
    pub fn add_unit(&mut self, registry: &mut NodeRegistry, name: impl Into<String>) -> Result<NodeId> {
        self.check_registry(registry)?;
        let slot = self.nodes.len();
        let node = registry.register(self.id, slot, name);
        self.input.push(0.0);
        self.u.push(self.params.u_init);
        self.v.push(self.params.v_init);
        self.spike.push(0.0);
        self.nodes.push(node);
        Ok(node)
    }

    pub fn add_units<I, S>(&mut self, registry: &mut NodeRegistry, names: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_registry(registry)?;
        names
            .into_iter()
            .map(|name| self.add_unit(registry, name))
            .collect()
    }

    /// Delete a slot, shift later slots down and update their records.
    ///
    /// Every later slot must still be registered; otherwise nothing changes.
    pub fn remove_unit(&mut self, registry: &mut NodeRegistry, slot: usize) -> Result<NodeId> {
        self.check_registry(registry)?;
        check_index(slot, self.len())?;
        for moved in &self.nodes[slot + 1..] {
            registry.lookup(*moved)?;
        }

        let node = self.nodes.remove(slot);
        self.input.remove(slot);
        self.u.remove(slot);
        self.v.remove(slot);
        self.spike.remove(slot);
        registry.remove(node);

        for (index, moved) in self.nodes.iter().enumerate().skip(slot) {
            registry.set_slot_index(*moved, index)?;
        }
        debug!(target: "arti-npu-runtime", "{}: removed {} at slot {}", self.id, node, slot);
        Ok(node)
    }

    /// Remove by identity; `Ok(false)` if it is no longer registered
    pub fn remove_node(&mut self, registry: &mut NodeRegistry, node: NodeId) -> Result<bool> {
        self.check_registry(registry)?;
        let record = match registry.lookup(node) {
            Ok(record) => record,
            Err(RuntimeError::IdentityNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if record.array != self.id {
            return Err(RuntimeError::WrongArray {
                node,
                expected: self.id,
                actual: record.array,
            });
        }
        let slot = record.slot;
        self.remove_unit(registry, slot)?;
        Ok(true)
    }

    pub fn rename(&self, registry: &mut NodeRegistry, slot: usize, name: impl Into<String>) -> Result<()> {
        self.check_registry(registry)?;
        registry.rename(self.node_id(slot)?, name)
    }

    /// Accumulate current into a slot before the next step
    pub fn add_input(&mut self, slot: usize, amount: f32) -> Result<()> {
        check_index(slot, self.len())?;
        self.input[slot] += amount;
        Ok(())
    }

    /// Zero every input current
    pub fn reset_input(&mut self) {
        self.input.fill(0.0);
    }

    /// Reinitialise `I`, `u` and `v`; spike flags keep the last step's output
    pub fn reset_all(&mut self) {
        self.input.fill(0.0);
        self.u.fill(self.params.u_init);
        self.v.fill(self.params.v_init);
    }

    /// Overwrite one unit's state variables
    pub fn set_state(&mut self, slot: usize, v: f32, u: f32) -> Result<()> {
        check_index(slot, self.len())?;
        self.v[slot] = v;
        self.u[slot] = u;
        Ok(())
    }

    /// Advance every unit by one tick. Input current is left in place.
    pub fn step(&mut self) -> Result<StepReport> {
        let start = Instant::now();
        let plan = self.context.plan();
        let backend = self.context.backend();

        backend.step_nodes(
            &plan,
            &self.params,
            NodeState {
                input: &self.input,
                u: &mut self.u,
                v: &mut self.v,
                spike: &mut self.spike,
            },
        )?;

        let spikes = self.spike.iter().filter(|&&s| s > 0.0).count();
        let report = StepReport {
            units: self.len(),
            spikes,
            strategy: backend.strategy(),
            elapsed: start.elapsed(),
        };
        trace!(
            target: "arti-npu-runtime",
            "{}: stepped {} units, {} spikes in {:?}",
            self.id, report.units, report.spikes, report.elapsed
        );
        Ok(report)
    }

    pub fn node_id(&self, slot: usize) -> Result<NodeId> {
        check_index(slot, self.len())?;
        Ok(self.nodes[slot])
    }

    pub fn input(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.input[slot])
    }

    pub fn u(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.u[slot])
    }

    pub fn v(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.v[slot])
    }

    pub fn spike(&self, slot: usize) -> Result<f32> {
        check_index(slot, self.len())?;
        Ok(self.spike[slot])
    }

    pub fn inputs(&self) -> &[f32] {
        &self.input
    }

    pub fn recovery(&self) -> &[f32] {
        &self.u
    }

    pub fn potentials(&self) -> &[f32] {
        &self.v
    }

    pub fn spikes(&self) -> &[f32] {
        &self.spike
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Slots that fired on the last step
    pub fn fired(&self) -> Vec<usize> {
        self.spike
            .iter()
            .enumerate()
            .filter(|(_, &s)| s > 0.0)
            .map(|(slot, _)| slot)
            .collect()
    }
}
