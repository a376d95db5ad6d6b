// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Node Lifecycle Tests
//!
//! Registration, removal and compaction, the spike/reset law, resting
//! trajectories and the worker-timeout contract.

use std::time::Duration;

use arti_npu_neural::{EquationFamily, IzhikevichParameters, NodeVariant, StpParameters};
use arti_npu_runtime::*;

fn registry() -> NodeRegistry {
    NodeRegistry::with_backend(
        ExecutionSettings::default(),
        Box::new(SingleThreadedBackend::new()),
    )
}

#[test]
fn test_add_remove_round_trip() {
    let mut reg = registry();
    let mut array = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
    let a = array.add_unit(&mut reg, "A").unwrap();
    let b = array.add_unit(&mut reg, "B").unwrap();
    let c = array.add_unit(&mut reg, "C").unwrap();

    // distinguishable state per unit
    array.set_state(0, -70.0, -14.0).unwrap();
    array.set_state(2, -50.0, -10.0).unwrap();

    let b_slot = reg.lookup(b).unwrap().slot;
    assert_eq!(array.remove_unit(&mut reg, b_slot).unwrap(), b);

    assert_eq!(array.len(), 2);
    assert_eq!(array.nodes(), &[a, c]);
    assert_eq!(reg.lookup(a).unwrap().slot, 0);
    assert_eq!(reg.lookup(c).unwrap().slot, 1);
    assert_eq!(array.v(0).unwrap(), -70.0);
    assert_eq!(array.v(1).unwrap(), -50.0);
    assert_eq!(array.u(1).unwrap(), -10.0);
    assert_eq!(reg.lookup(c).unwrap().name, "C");

    // second removal of the same identity is a no-op
    assert_eq!(reg.lookup(b), Err(RuntimeError::IdentityNotFound(b)));
    assert_eq!(array.remove_node(&mut reg, b), Ok(false));
    assert!(reg.remove(b).is_none());
    assert_eq!(array.len(), 2);
}

#[test]
fn test_failed_removal_changes_nothing() {
    let mut reg = registry();
    let mut array = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
    let a = array.add_unit(&mut reg, "A").unwrap();
    let b = array.add_unit(&mut reg, "B").unwrap();
    let c = array.add_unit(&mut reg, "C").unwrap();

    // record dropped behind the array's back
    reg.remove(b);

    assert_eq!(
        array.remove_unit(&mut reg, 0),
        Err(RuntimeError::IdentityNotFound(b))
    );
    assert_eq!(array.len(), 3);
    assert_eq!(array.nodes(), &[a, b, c]);
    assert_eq!(reg.lookup(a).unwrap().slot, 0);
    assert_eq!(reg.lookup(c).unwrap().slot, 2);

    // the tail slot has nothing after it and still removes cleanly
    assert_eq!(array.remove_unit(&mut reg, 2), Ok(c));
    assert_eq!(array.len(), 2);
}

#[test]
fn test_array_rejects_foreign_registry() {
    let mut owner = registry();
    let mut other = registry();
    let mut array = NodeArray::new(&mut owner, NodeVariant::RegularSpiking.parameters()).unwrap();
    let id = array.add_unit(&mut owner, "soma").unwrap();

    assert_eq!(array.add_unit(&mut other, "stray"), Err(RuntimeError::RegistryMismatch));
    assert_eq!(array.remove_unit(&mut other, 0), Err(RuntimeError::RegistryMismatch));
    assert_eq!(array.remove_node(&mut other, id), Err(RuntimeError::RegistryMismatch));
    assert!(other.is_empty());
    assert_eq!(array.len(), 1);
    assert_eq!(owner.lookup(id).unwrap().slot, 0);

    let mut synapses = SynapseArray::new(&owner);
    assert_eq!(
        synapses.add_synapse(&other, id, id, StpParameters::default()),
        Err(RuntimeError::RegistryMismatch)
    );
}

#[test]
fn test_removal_preserves_order_and_identities() {
    let mut reg = registry();
    let mut array = NodeArray::new(&mut reg, NodeVariant::FastSpiking.parameters()).unwrap();
    let ids = array.add_units(&mut reg, (0..10).map(|i| format!("u{}", i))).unwrap();

    for &gone in &[ids[0], ids[4], ids[9]] {
        assert_eq!(array.remove_node(&mut reg, gone), Ok(true));
    }

    let survivors: Vec<_> = ids
        .iter()
        .copied()
        .filter(|id| ![ids[0], ids[4], ids[9]].contains(id))
        .collect();
    assert_eq!(array.nodes(), survivors.as_slice());
    for (slot, id) in survivors.iter().enumerate() {
        assert_eq!(reg.lookup(*id).unwrap().slot, slot);
        assert_eq!(array.node_id(slot).unwrap(), *id);
    }

    // identities are never reused
    let fresh = array.add_unit(&mut reg, "fresh").unwrap();
    assert_eq!(fresh, NodeId(10));
}

/// Free integration written out independently of the kernels
fn integrate_quadratic(p: &IzhikevichParameters, input: f32, u: f32, v: f32) -> (f32, f32) {
    let mut v = v;
    for _ in 0..2 {
        v += 0.5 * (0.04 * v * v + 5.0 * v + 140.0 - u + input);
    }
    (u + p.a * (p.b * v - u), v)
}

#[test]
fn test_spike_reset_law() {
    let params = NodeVariant::RegularSpiking
        .parameters()
        .with_state_dependent_reset(0.05, 0.25)
        .with_recovery_ceiling(-6.0);
    let mut reg = registry();
    let mut array = NodeArray::new(&mut reg, params).unwrap();
    array.add_unit(&mut reg, "driven").unwrap();
    array.add_input(0, 12.0).unwrap();

    let mut spikes = 0;
    let mut quiet = 0;
    for _ in 0..200 {
        let (u0, v0) = (array.u(0).unwrap(), array.v(0).unwrap());
        let (u_free, v_free) = integrate_quadratic(&params, 12.0, u0, v0);
        array.step().unwrap();

        if v_free >= params.vp + params.vpu * u_free {
            spikes += 1;
            assert_eq!(array.spike(0).unwrap(), 1.0);
            assert_eq!(array.v(0).unwrap(), params.c + params.cu * u_free);
            assert_eq!(array.u(0).unwrap(), (u_free + params.d).min(params.umax));
        } else {
            quiet += 1;
            assert_eq!(array.spike(0).unwrap(), 0.0);
            assert_eq!(array.v(0).unwrap(), v_free);
            assert_eq!(array.u(0).unwrap(), u_free);
        }
    }
    assert!(spikes > 0, "constant drive never crossed threshold");
    assert!(quiet > 0);
}

#[test]
fn test_pyramidal_resting_trajectory() {
    let params = IzhikevichParameters::conductance(0.03, -2.0, -50.0, 100.0, 100.0, 0.7, -60.0, -40.0, 35.0);
    assert_eq!(params.family, EquationFamily::Conductance);

    let mut reg = registry();
    let mut array = NodeArray::new(&mut reg, params).unwrap();
    array.add_unit(&mut reg, "soma").unwrap();
    assert_eq!((array.v(0).unwrap(), array.u(0).unwrap()), (-60.0, 0.0));

    let report = array.step().unwrap();
    assert_eq!(report.spikes, 0);
    assert_eq!(array.spike(0).unwrap(), 0.0);
    assert!((array.v(0).unwrap() + 60.0).abs() < 1e-6);
    assert!(array.u(0).unwrap().abs() < 1e-6);
}

#[test]
fn test_detected_strategy_is_immutable() {
    let reg = NodeRegistry::new(ExecutionSettings::default());
    let strategy = reg.selected_strategy();
    let name = reg.backend_name().to_string();
    reg.set_units_per_thread(7);
    for _ in 0..100 {
        assert_eq!(reg.selected_strategy(), strategy);
    }
    assert_eq!(reg.backend_name(), name);
    assert_eq!(hardware_profile(), hardware_profile());
}

#[test]
fn test_forced_single_threaded_strategy() {
    let reg = NodeRegistry::new(ExecutionSettings::default().with_strategy(ExecutionStrategy::SingleThreaded));
    assert_eq!(reg.selected_strategy(), ExecutionStrategy::SingleThreaded);
}

#[test]
fn test_worker_timeout_is_reported() {
    let settings = ExecutionSettings::default()
        .with_units_per_thread(8)
        .with_max_threads(2)
        .with_worker_timeout(Duration::from_millis(25));
    let backend = ThreadedBackend::new(2)
        .unwrap()
        .with_batch_delay(Duration::from_millis(400));
    let mut reg = NodeRegistry::with_backend(settings, Box::new(backend));
    assert_eq!(reg.selected_strategy(), ExecutionStrategy::MultiThreaded);

    let mut array = NodeArray::new(&mut reg, NodeVariant::RegularSpiking.parameters()).unwrap();
    array.add_units(&mut reg, (0..64).map(|_| "")).unwrap();
    for slot in 0..64 {
        array.add_input(slot, 20.0).unwrap();
    }
    let before = (array.potentials().to_vec(), array.recovery().to_vec());

    match array.step() {
        Err(RuntimeError::WorkerTimeout { timeout_ms, pending_batches }) => {
            assert_eq!(timeout_ms, 25);
            assert!(pending_batches > 0);
        }
        other => panic!("expected WorkerTimeout, got {:?}", other),
    }

    // nothing from the timed-out tick was committed
    assert_eq!(array.potentials(), before.0.as_slice());
    assert_eq!(array.recovery(), before.1.as_slice());
}

#[test]
fn test_threaded_step_within_deadline() {
    let settings = ExecutionSettings::default()
        .with_units_per_thread(8)
        .with_max_threads(2)
        .with_worker_timeout(Duration::from_secs(10));
    let mut reg = NodeRegistry::with_backend(settings, Box::new(ThreadedBackend::new(2).unwrap()));
    let mut array = NodeArray::new(&mut reg, NodeVariant::FastSpiking.parameters()).unwrap();
    array.add_units(&mut reg, (0..33).map(|_| "")).unwrap();
    let report = array.step().unwrap();
    assert_eq!(report.units, 33);
    assert_eq!(report.strategy, ExecutionStrategy::MultiThreaded);
}
