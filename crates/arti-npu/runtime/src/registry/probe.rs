// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware probe and strategy selection.
//!
//! Selection priority (first usable wins):
//! 1. GPU: device context and kernel module initialise without error
//! 2. SIMD: more than one logical core and a usable vector width
//! 3. MultiThreaded: more than one logical core
//! 4. SingleThreaded: always available
//!
//! A requested strategy starts the chain at that position.

use std::sync::OnceLock;

use tracing::{debug, info, warn};

use super::settings::ExecutionSettings;
use crate::backend::{create_backend, ExecutionStrategy, SingleThreadedBackend, StepBackend};

static HARDWARE: OnceLock<HardwareProfile> = OnceLock::new();

/// What this machine offers, probed once per process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProfile {
    pub logical_cores: usize,
    /// f32 lanes of the widest vector unit detected
    pub simd_lanes: Option<usize>,
}

impl HardwareProfile {
    fn detect() -> Self {
        let profile = Self {
            logical_cores: num_cpus::get().max(1),
            simd_lanes: detect_simd_lanes(),
        };
        info!(
            target: "arti-npu-runtime",
            "Hardware probe: {} logical cores, SIMD lanes: {:?}",
            profile.logical_cores, profile.simd_lanes
        );
        profile
    }

    /// Half the logical cores, at least one
    pub fn default_max_threads(&self) -> usize {
        (self.logical_cores / 2).max(1)
    }

    /// Whether the CPU side of `strategy` can run here (GPU is decided by initialisation)
    pub fn supports(&self, strategy: ExecutionStrategy) -> bool {
        match strategy {
            ExecutionStrategy::Gpu => true,
            ExecutionStrategy::Simd => self.logical_cores > 1 && self.simd_lanes.is_some(),
            ExecutionStrategy::MultiThreaded => self.logical_cores > 1,
            ExecutionStrategy::SingleThreaded => true,
        }
    }
}

/// Cached process-wide hardware profile
pub fn hardware_profile() -> &'static HardwareProfile {
    HARDWARE.get_or_init(HardwareProfile::detect)
}

#[cfg(target_arch = "x86_64")]
fn detect_simd_lanes() -> Option<usize> {
    if is_x86_feature_detected!("avx512f") {
        Some(16)
    } else if is_x86_feature_detected!("avx2") {
        Some(8)
    } else if is_x86_feature_detected!("sse2") {
        Some(4)
    } else {
        None
    }
}

#[cfg(target_arch = "aarch64")]
fn detect_simd_lanes() -> Option<usize> {
    if std::arch::is_aarch64_feature_detected!("neon") {
        Some(4)
    } else {
        None
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_simd_lanes() -> Option<usize> {
    None
}

/// Walk the probe chain and build the first backend that initialises.
///
/// Failures are logged and skipped; single-threaded always succeeds.
pub(crate) fn select_backend(
    settings: &ExecutionSettings,
    max_threads: usize,
    hardware: &HardwareProfile,
) -> Box<dyn StepBackend> {
    let requested = settings.strategy;
    let chain = requested.unwrap_or(ExecutionStrategy::Gpu).fallback_chain();

    for &strategy in chain {
        let forced = requested == Some(strategy);

        if !hardware.supports(strategy) {
            if forced {
                warn!(
                    target: "arti-npu-runtime",
                    "{} strategy requested but not supported on this machine, falling back",
                    strategy
                );
            } else {
                debug!(target: "arti-npu-runtime", "Skipping {} strategy (unsupported)", strategy);
            }
            continue;
        }

        match create_backend(strategy, max_threads, &settings.gpu) {
            Ok(backend) => {
                info!(
                    target: "arti-npu-runtime",
                    "Selected {} strategy: {}",
                    strategy,
                    backend.backend_name()
                );
                return backend;
            }
            Err(e) if forced => {
                warn!(target: "arti-npu-runtime", "{} strategy unavailable ({}), falling back", strategy, e);
            }
            Err(e) => {
                info!(target: "arti-npu-runtime", "{} strategy unavailable ({})", strategy, e);
            }
        }
    }

    Box::new(SingleThreadedBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_is_cached() {
        let a = hardware_profile() as *const HardwareProfile;
        let b = hardware_profile() as *const HardwareProfile;
        assert_eq!(a, b);
        assert!(hardware_profile().logical_cores >= 1);
    }

    #[test]
    fn test_half_utilisation_policy() {
        let hw = |cores| HardwareProfile {
            logical_cores: cores,
            simd_lanes: Some(8),
        };
        assert_eq!(hw(1).default_max_threads(), 1);
        assert_eq!(hw(2).default_max_threads(), 1);
        assert_eq!(hw(16).default_max_threads(), 8);
    }

    #[test]
    fn test_single_core_skips_parallel_strategies() {
        let hw = HardwareProfile {
            logical_cores: 1,
            simd_lanes: Some(8),
        };
        let settings = ExecutionSettings::default().with_strategy(ExecutionStrategy::Simd);
        let backend = select_backend(&settings, 1, &hw);
        assert_eq!(backend.strategy(), ExecutionStrategy::SingleThreaded);
    }

    #[test]
    fn test_forced_single_threaded() {
        let hw = HardwareProfile {
            logical_cores: 8,
            simd_lanes: Some(8),
        };
        let settings = ExecutionSettings::default().with_strategy(ExecutionStrategy::SingleThreaded);
        assert_eq!(
            select_backend(&settings, 4, &hw).strategy(),
            ExecutionStrategy::SingleThreaded
        );
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_auto_falls_back_from_gpu() {
        let hw = HardwareProfile {
            logical_cores: 4,
            simd_lanes: Some(8),
        };
        let backend = select_backend(&ExecutionSettings::default(), 2, &hw);
        assert_eq!(backend.strategy(), ExecutionStrategy::Simd);
    }
}
