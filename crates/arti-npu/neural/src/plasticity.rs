// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Short-term plasticity (Tsodyks-Markram, one tick per update).
//!
//! ```text
//! u += (U − u) / tf        facilitation decays towards U
//! x += (1 − x) / td        resources recover towards 1
//! on a presynaptic spike:
//!     release = u · x
//!     x -= release
//!     u += U · (1 − u)
//! ```
//!
//! The kernels write only the synapse's own `u`, `x` and `release`. Delivering
//! `weight · release` to the postsynaptic unit is the caller's job.

use crate::dynamics::LANES;
use crate::types::error::{finite, within};
use crate::types::Result;

/// Constants of one synapse
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct StpParameters {
    /// Use increment `U`
    pub big_u: f32,
    /// Facilitation time constant, in ticks
    pub tf: f32,
    /// Depression time constant, in ticks
    pub td: f32,
    /// Current delivered per unit of release
    pub weight: f32,
}

impl StpParameters {
    pub fn new(big_u: f32, tf: f32, td: f32, weight: f32) -> Self {
        Self {
            big_u,
            tf,
            td,
            weight,
        }
    }

    pub fn validate(&self) -> Result<()> {
        within("U", self.big_u, 0.0, 1.0)?;
        within("tf", self.tf, 1.0, f32::MAX)?;
        within("td", self.td, 1.0, f32::MAX)?;
        finite("weight", self.weight)
    }
}

impl Default for StpParameters {
    fn default() -> Self {
        // depressing synapse
        Self::new(0.5, 1.0, 20.0, 1.0)
    }
}

/// Update one synapse, returns the released fraction
#[inline(always)]
pub fn stp_update(big_u: f32, tf: f32, td: f32, pre_spike: f32, u: &mut f32, x: &mut f32) -> f32 {
    let mut nu = *u + (big_u - *u) / tf;
    let mut nx = *x + (1.0 - *x) / td;
    let release = if pre_spike > 0.0 { nu * nx } else { 0.0 };
    nx -= release;
    if pre_spike > 0.0 {
        nu += big_u * (1.0 - nu);
    }
    *u = nu;
    *x = nx;
    release
}

/// Scalar update over parallel slices of equal length
pub fn stp_range(
    pre_spike: &[f32],
    big_u: &[f32],
    tf: &[f32],
    td: &[f32],
    u: &mut [f32],
    x: &mut [f32],
    release: &mut [f32],
) {
    for i in 0..pre_spike.len() {
        release[i] = stp_update(big_u[i], tf[i], td[i], pre_spike[i], &mut u[i], &mut x[i]);
    }
}

/// Same update in groups of [`LANES`] with a spike mask, scalar tail after
pub fn stp_range_lanes(
    pre_spike: &[f32],
    big_u: &[f32],
    tf: &[f32],
    td: &[f32],
    u: &mut [f32],
    x: &mut [f32],
    release: &mut [f32],
) {
    let n = pre_spike.len();
    let body = n - n % LANES;

    let mut base = 0;
    while base < body {
        let mut nu = [0.0f32; LANES];
        let mut nx = [0.0f32; LANES];
        for l in 0..LANES {
            let i = base + l;
            nu[l] = u[i] + (big_u[i] - u[i]) / tf[i];
            nx[l] = x[i] + (1.0 - x[i]) / td[i];
        }
        for l in 0..LANES {
            let i = base + l;
            let fired = pre_spike[i] > 0.0;
            let r = if fired { nu[l] * nx[l] } else { 0.0 };
            x[i] = nx[l] - r;
            u[i] = if fired { nu[l] + big_u[i] * (1.0 - nu[l]) } else { nu[l] };
            release[i] = r;
        }
        base += LANES;
    }

    stp_range(
        &pre_spike[body..],
        &big_u[body..],
        &tf[body..],
        &td[body..],
        &mut u[body..],
        &mut x[body..],
        &mut release[body..],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterError;

    #[test]
    fn test_validation() {
        assert!(StpParameters::default().validate().is_ok());
        assert!(matches!(
            StpParameters::new(1.5, 1.0, 1.0, 1.0).validate(),
            Err(ParameterError::OutOfRange { name: "U", .. })
        ));
        assert!(StpParameters::new(0.5, 0.5, 1.0, 1.0).validate().is_err());
        assert!(StpParameters::new(0.5, 1.0, 0.0, 1.0).validate().is_err());
        assert!(StpParameters::new(0.5, 1.0, 1.0, f32::INFINITY).validate().is_err());
    }

    #[test]
    fn test_no_spike_relaxes_without_release() {
        let (mut u, mut x) = (0.9f32, 0.2f32);
        let r = stp_update(0.5, 10.0, 4.0, 0.0, &mut u, &mut x);
        assert_eq!(r, 0.0);
        assert!((u - 0.86).abs() < 1e-6);
        assert!((x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_spike_releases_and_depresses() {
        let (mut u, mut x) = (0.5f32, 1.0f32);
        let r = stp_update(0.5, 1.0, 20.0, 1.0, &mut u, &mut x);
        assert!((r - 0.5).abs() < 1e-6);
        assert!((x - 0.5).abs() < 1e-6);
        assert!((u - 0.75).abs() < 1e-6);

        // second spike releases less while resources recover slowly
        let r2 = stp_update(0.5, 1.0, 20.0, 1.0, &mut u, &mut x);
        assert!(r2 < r);
    }

    #[test]
    fn test_lanes_match_scalar() {
        let n = 19;
        let pre: Vec<f32> = (0..n).map(|i| (i % 3 == 0) as u8 as f32).collect();
        let big_u: Vec<f32> = (0..n).map(|i| 0.1 + 0.04 * i as f32).collect();
        let tf: Vec<f32> = (0..n).map(|i| 1.0 + i as f32).collect();
        let td: Vec<f32> = (0..n).map(|i| 2.0 + 0.5 * i as f32).collect();

        let (mut u1, mut x1, mut r1) = (big_u.clone(), vec![1.0; n], vec![0.0; n]);
        let (mut u2, mut x2, mut r2) = (u1.clone(), x1.clone(), r1.clone());
        for _ in 0..5 {
            stp_range(&pre, &big_u, &tf, &td, &mut u1, &mut x1, &mut r1);
            stp_range_lanes(&pre, &big_u, &tf, &td, &mut u2, &mut x2, &mut r2);
        }
        assert_eq!(u1, u2);
        assert_eq!(x1, x2);
        assert_eq!(r1, r2);
    }
}
