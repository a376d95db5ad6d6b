// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Izhikevich Parameter Sets
//!
//! ## Model Dynamics
//!
//! ```text
//! Quadratic family (two half-steps per tick):
//!     v += 0.5 × (0.04v² + 5v + 140 − u + I)
//!     v += 0.5 × (0.04v² + 5v + 140 − u + I)
//!     u += a × (b·v − u)
//!
//! Conductance family:
//!     v += (k(v − vr)(v − vt) − u + I) / C
//!     b_eff = b if v ≥ bv else ba
//!     u += a × (b_eff · max(uvmin, (v − uv)^upow) + b2 · max(uvmin, v − uv) − u)
//!
//! Spike and reset (both families):
//!     if v ≥ vp + vpu·u:
//!         spike = 1, v = c + cu·u, u = min(u + d, umax)
//!     else:
//!         spike = 0
//! ```
//!
//! With `vpu = cu = 0` and `umax = +∞` the reset collapses to the classic
//! fixed threshold / fixed reset rule.

use super::traits::ModelParameters;
use crate::types::error::{finite, not_nan, positive};
use crate::types::Result;

/// Default coefficient for u in the reset equation
pub const DEF_C_U: f32 = 0.0;
/// Default recovery ceiling
pub const DEF_U_MAX: f32 = f32::INFINITY;
/// Default floor of the recovery drive terms
pub const DEF_UV_MIN: f32 = f32::NEG_INFINITY;
/// Default exponent of the recovery drive
pub const DEF_U_POW: f32 = 1.0;
/// Default coefficient for u in the spike cutoff equation
pub const DEF_VP_U: f32 = 0.0;

/// Number of floats in [`IzhikevichParameters::to_device_array`]
pub const DEVICE_PARAMETER_COUNT: usize = 18;

/// Which membrane equation a variant integrates.
///
/// Chosen once per variant; the kernels match on it outside the unit loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "snake_case"))]
pub enum EquationFamily {
    /// Classic two-variable form with a fixed quadratic polynomial
    Quadratic,
    /// Generalized form with capacitance, rest and threshold potentials
    Conductance,
}

impl EquationFamily {
    /// Integer tag shared with the device kernels
    pub fn device_tag(self) -> i32 {
        match self {
            EquationFamily::Quadratic => 0,
            EquationFamily::Conductance => 1,
        }
    }
}

/// Biophysical constants shared by every unit of one node array
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct IzhikevichParameters {
    pub family: EquationFamily,

    /// Recovery time constant
    pub a: f32,
    /// Recovery sensitivity to v
    pub b: f32,
    /// Second, linear recovery sensitivity
    pub b2: f32,
    /// Alternate b used below `bv`
    pub ba: f32,
    /// Voltage threshold selecting between `b` and `ba`
    pub bv: f32,
    /// Reset potential
    pub c: f32,
    /// Membrane capacitance (conductance family only)
    pub capacitance: f32,
    /// Coefficient of u in the reset potential
    pub cu: f32,
    /// Recovery jump after a spike
    pub d: f32,
    /// Conductance towards child compartments
    pub gc: f32,
    /// Conductance towards the parent compartment
    pub gp: f32,
    /// Gain of the quadratic term (conductance family only)
    pub k: f32,
    /// Resting potential
    pub vr: f32,
    /// Instantaneous threshold potential
    pub vt: f32,
    /// Spike cutoff
    pub vp: f32,
    /// Coefficient of u in the spike cutoff
    pub vpu: f32,
    /// Recovery ceiling applied at reset
    pub umax: f32,
    /// Exponent of the recovery drive
    pub upow: f32,
    /// Offset subtracted from v in the recovery drive
    pub uv: f32,
    /// Floor of the recovery drive terms
    pub uvmin: f32,

    /// Potential of a freshly added or reset unit
    pub v_init: f32,
    /// Recovery of a freshly added or reset unit
    pub u_init: f32,
}

impl IzhikevichParameters {
    /// Quadratic-family variant with neutral generalized terms
    pub fn quadratic(a: f32, b: f32, c: f32, d: f32, vp: f32, v_init: f32) -> Self {
        Self {
            family: EquationFamily::Quadratic,
            a,
            b,
            b2: 0.0,
            ba: b,
            bv: 0.0,
            c,
            capacitance: 1.0,
            cu: DEF_C_U,
            d,
            gc: 1.0,
            gp: 1.0,
            k: 0.0,
            vr: 0.0,
            vt: 0.0,
            vp,
            vpu: DEF_VP_U,
            umax: DEF_U_MAX,
            upow: DEF_U_POW,
            uv: 0.0,
            uvmin: DEF_UV_MIN,
            v_init,
            u_init: b * v_init,
        }
    }

    /// Conductance-family variant resting at `vr` with no recovery current
    #[allow(clippy::too_many_arguments)]
    pub fn conductance(
        a: f32,
        b: f32,
        c: f32,
        d: f32,
        capacitance: f32,
        k: f32,
        vr: f32,
        vt: f32,
        vp: f32,
    ) -> Self {
        Self {
            family: EquationFamily::Conductance,
            a,
            b,
            b2: 0.0,
            ba: b,
            bv: 0.0,
            c,
            capacitance,
            cu: DEF_C_U,
            d,
            gc: 1.0,
            gp: 1.0,
            k,
            vr,
            vt,
            vp,
            vpu: DEF_VP_U,
            umax: DEF_U_MAX,
            upow: DEF_U_POW,
            uv: vr,
            uvmin: DEF_UV_MIN,
            v_init: vr,
            u_init: 0.0,
        }
    }

    pub fn with_initial_state(mut self, v_init: f32, u_init: f32) -> Self {
        self.v_init = v_init;
        self.u_init = u_init;
        self
    }

    pub fn with_conductances(mut self, gc: f32, gp: f32) -> Self {
        self.gc = gc;
        self.gp = gp;
        self
    }

    /// State-dependent threshold `vp + vpu·u` and reset `c + cu·u`
    pub fn with_state_dependent_reset(mut self, vpu: f32, cu: f32) -> Self {
        self.vpu = vpu;
        self.cu = cu;
        self
    }

    pub fn with_recovery_ceiling(mut self, umax: f32) -> Self {
        self.umax = umax;
        self
    }

    /// Shape of the recovery drive: `(v − uv)^upow` floored at `uvmin`
    pub fn with_recovery_drive(mut self, upow: f32, uv: f32, uvmin: f32) -> Self {
        self.upow = upow;
        self.uv = uv;
        self.uvmin = uvmin;
        self
    }

    /// Use `ba` instead of `b` while v is below `bv`
    pub fn with_voltage_gated_b(mut self, ba: f32, bv: f32) -> Self {
        self.ba = ba;
        self.bv = bv;
        self
    }

    pub fn with_linear_recovery(mut self, b2: f32) -> Self {
        self.b2 = b2;
        self
    }

    /// Spike cutoff for the given recovery value
    #[inline(always)]
    pub fn spike_cutoff(&self, u: f32) -> f32 {
        self.vp + self.vpu * u
    }

    /// Flat layout consumed by the device kernels.
    ///
    /// Order: a, b, b2, ba, bv, c, C, cu, d, k, vr, vt, vp, vpu, umax, upow, uv, uvmin.
    pub fn to_device_array(&self) -> [f32; DEVICE_PARAMETER_COUNT] {
        [
            self.a,
            self.b,
            self.b2,
            self.ba,
            self.bv,
            self.c,
            self.capacitance,
            self.cu,
            self.d,
            self.k,
            self.vr,
            self.vt,
            self.vp,
            self.vpu,
            self.umax,
            self.upow,
            self.uv,
            self.uvmin,
        ]
    }
}

impl ModelParameters for IzhikevichParameters {
    fn validate(&self) -> Result<()> {
        finite("a", self.a)?;
        finite("b", self.b)?;
        finite("b2", self.b2)?;
        finite("ba", self.ba)?;
        finite("bv", self.bv)?;
        finite("c", self.c)?;
        finite("cu", self.cu)?;
        finite("d", self.d)?;
        finite("gc", self.gc)?;
        finite("gp", self.gp)?;
        finite("vp", self.vp)?;
        finite("vpu", self.vpu)?;
        finite("uv", self.uv)?;
        finite("v_init", self.v_init)?;
        finite("u_init", self.u_init)?;
        not_nan("umax", self.umax)?;
        not_nan("uvmin", self.uvmin)?;

        finite("upow", self.upow)?;
        if self.upow < 0.0 {
            return Err(crate::ParameterError::OutOfRange {
                name: "upow",
                min: 0.0,
                max: f32::MAX,
                value: self.upow,
            });
        }

        if self.family == EquationFamily::Conductance {
            positive("C", self.capacitance)?;
            finite("k", self.k)?;
            finite("vr", self.vr)?;
            finite("vt", self.vt)?;
        }
        Ok(())
    }

    fn parameter_count() -> usize {
        20 // a, b, b2, ba, bv, c, C, cu, d, gc, gp, k, vr, vt, vp, vpu, umax, upow, uv, uvmin
    }
}
