// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-unit Izhikevich step kernels.
//!
//! Two renditions of the same arithmetic:
//! - [`step_unit`] / [`step_range`]: scalar reference, one unit at a time
//! - [`step_lanes`] / [`step_range_lanes`]: fixed groups of [`LANES`] units with a
//!   branchless spike mask, plus a scalar tail
//!
//! Both perform identical floating-point operations in identical order, so the
//! lane kernel reproduces the scalar one bit for bit. The lane loops are written
//! over fixed-size arrays so LLVM can lower them to vector instructions.

use crate::models::{EquationFamily, IzhikevichParameters};

/// Width of one lane group
pub const LANES: usize = 8;

/// Free integration of the quadratic family, returns `(u, v)`
#[inline(always)]
fn integrate_quadratic(p: &IzhikevichParameters, input: f32, u: f32, v: f32) -> (f32, f32) {
    let mut v = v;
    v += 0.5 * (0.04 * v * v + 5.0 * v + 140.0 - u + input);
    v += 0.5 * (0.04 * v * v + 5.0 * v + 140.0 - u + input);
    let u = u + p.a * (p.b * v - u);
    (u, v)
}

/// Free integration of the conductance family, returns `(u, v)`
#[inline(always)]
fn integrate_conductance(p: &IzhikevichParameters, input: f32, u: f32, v: f32) -> (f32, f32) {
    let v = v + (p.k * (v - p.vr) * (v - p.vt) - u + input) / p.capacitance;
    let b_eff = if v >= p.bv { p.b } else { p.ba };
    let dv = v - p.uv;
    // f32::max discards NaN, so a fractional power of a negative base floors at uvmin
    let drive = p.uvmin.max(dv.powf(p.upow));
    let linear = p.uvmin.max(dv);
    let u = u + p.a * (b_eff * drive + p.b2 * linear - u);
    (u, v)
}

#[inline(always)]
fn integrate(p: &IzhikevichParameters, input: f32, u: f32, v: f32) -> (f32, f32) {
    match p.family {
        EquationFamily::Quadratic => integrate_quadratic(p, input, u, v),
        EquationFamily::Conductance => integrate_conductance(p, input, u, v),
    }
}

/// Advance one unit by one tick, returns true if it spiked
#[inline(always)]
pub fn step_unit(p: &IzhikevichParameters, input: f32, u: &mut f32, v: &mut f32) -> bool {
    let (nu, nv) = integrate(p, input, *u, *v);
    if nv >= p.spike_cutoff(nu) {
        *v = p.c + p.cu * nu;
        *u = (nu + p.d).min(p.umax);
        true
    } else {
        *v = nv;
        *u = nu;
        false
    }
}

/// Scalar reference over parallel slices of equal length
pub fn step_range(
    p: &IzhikevichParameters,
    input: &[f32],
    u: &mut [f32],
    v: &mut [f32],
    spike: &mut [f32],
) {
    debug_assert!(input.len() == u.len() && u.len() == v.len() && v.len() == spike.len());

    for (((i, u), v), s) in input
        .iter()
        .zip(u.iter_mut())
        .zip(v.iter_mut())
        .zip(spike.iter_mut())
    {
        *s = if step_unit(p, *i, u, v) { 1.0 } else { 0.0 };
    }
}

/// Advance one group of [`LANES`] units.
///
/// Every lane is integrated, then a per-lane mask blends reset values into the
/// lanes that crossed their cutoff.
#[inline(always)]
pub fn step_lanes(
    p: &IzhikevichParameters,
    input: &[f32; LANES],
    u: &mut [f32; LANES],
    v: &mut [f32; LANES],
    spike: &mut [f32; LANES],
) {
    let mut nu = [0.0f32; LANES];
    let mut nv = [0.0f32; LANES];

    match p.family {
        EquationFamily::Quadratic => {
            for l in 0..LANES {
                (nu[l], nv[l]) = integrate_quadratic(p, input[l], u[l], v[l]);
            }
        }
        EquationFamily::Conductance => {
            for l in 0..LANES {
                (nu[l], nv[l]) = integrate_conductance(p, input[l], u[l], v[l]);
            }
        }
    }

    for l in 0..LANES {
        let fired = nv[l] >= p.spike_cutoff(nu[l]);
        let v_reset = p.c + p.cu * nu[l];
        let u_reset = (nu[l] + p.d).min(p.umax);
        v[l] = if fired { v_reset } else { nv[l] };
        u[l] = if fired { u_reset } else { nu[l] };
        spike[l] = if fired { 1.0 } else { 0.0 };
    }
}

/// Lane kernel over parallel slices: whole groups first, scalar tail after
pub fn step_range_lanes(
    p: &IzhikevichParameters,
    input: &[f32],
    u: &mut [f32],
    v: &mut [f32],
    spike: &mut [f32],
) {
    debug_assert!(input.len() == u.len() && u.len() == v.len() && v.len() == spike.len());

    let body = input.len() - input.len() % LANES;
    let (input_body, input_tail) = input.split_at(body);
    let (u_body, u_tail) = u.split_at_mut(body);
    let (v_body, v_tail) = v.split_at_mut(body);
    let (spike_body, spike_tail) = spike.split_at_mut(body);

    let mut li = [0.0f32; LANES];
    let mut lu = [0.0f32; LANES];
    let mut lv = [0.0f32; LANES];
    let mut ls = [0.0f32; LANES];

    for (((ci, cu), cv), cs) in input_body
        .chunks_exact(LANES)
        .zip(u_body.chunks_exact_mut(LANES))
        .zip(v_body.chunks_exact_mut(LANES))
        .zip(spike_body.chunks_exact_mut(LANES))
    {
        li.copy_from_slice(ci);
        lu.copy_from_slice(cu);
        lv.copy_from_slice(cv);
        step_lanes(p, &li, &mut lu, &mut lv, &mut ls);
        cu.copy_from_slice(&lu);
        cv.copy_from_slice(&lv);
        cs.copy_from_slice(&ls);
    }

    step_range(p, input_tail, u_tail, v_tail, spike_tail);
}
