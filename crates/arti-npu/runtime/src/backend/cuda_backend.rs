// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! CUDA Backend
//!
//! Per step: copy `I, u, v, spike` to the device, launch one kernel covering
//! every unit, synchronize, copy back. Device buffers are dropped at the end of
//! the call. Any device error is surfaced as [`RuntimeError::DeviceFailure`];
//! the backend never falls back mid-run.
//!
//! # Minimum Requirements
//! - NVIDIA GPU with Compute Capability 7.0+ (Volta/2017 or newer)
//! - CUDA 11.8 or later

use std::sync::Arc;

use arti_npu_neural::IzhikevichParameters;
use cudarc::driver::{CudaDevice, LaunchAsync, LaunchConfig};
use cudarc::nvrtc::Ptx;
use tracing::{debug, info};

use super::{DispatchPlan, ExecutionStrategy, NodeState, StepBackend, SynapseState};
use crate::error::{Result, RuntimeError};
use crate::registry::GpuSettings;

const MODULE: &str = "arti_neural";
const NODE_KERNEL: &str = "izhikevich_step";
const SYNAPSE_KERNEL: &str = "stp_step";

/// PTX compiled by build.rs (empty when nvcc was not available)
const EMBEDDED_PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/neural_kernels.ptx"));

fn device_err(context: &str, e: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::DeviceFailure(format!("{}: {}", context, e))
}

/// CUDA backend bound to one device
pub struct CudaBackend {
    name: String,
    device: Arc<CudaDevice>,
    block_size: u32,
}

impl CudaBackend {
    /// Create the device context and load the kernel module.
    ///
    /// Any failure here is a [`RuntimeError::DeviceInitFailure`].
    pub fn new(settings: &GpuSettings) -> Result<Self> {
        let ordinal = settings.device_ordinal;
        info!(target: "arti-npu-runtime", "Initializing CUDA backend on GPU {}...", ordinal);

        let device = CudaDevice::new(ordinal).map_err(|e| {
            RuntimeError::DeviceInitFailure(format!("Failed to create CUDA device {}: {}", ordinal, e))
        })?;

        let ptx = match &settings.kernel_module_path {
            Some(path) => {
                info!(target: "arti-npu-runtime", "Loading CUDA kernels from {}", path.display());
                Ptx::from_file(path.clone())
            }
            None => {
                if EMBEDDED_PTX.trim().is_empty() {
                    return Err(RuntimeError::DeviceInitFailure(
                        "No kernel module: nvcc was unavailable at build time and no kernel_module_path is set"
                            .to_string(),
                    ));
                }
                Ptx::from_src(EMBEDDED_PTX)
            }
        };

        device
            .load_ptx(ptx, MODULE, &[NODE_KERNEL, SYNAPSE_KERNEL])
            .map_err(|e| RuntimeError::DeviceInitFailure(format!("Failed to load PTX: {}", e)))?;

        for kernel in [NODE_KERNEL, SYNAPSE_KERNEL] {
            if device.get_func(MODULE, kernel).is_none() {
                return Err(RuntimeError::DeviceInitFailure(format!(
                    "Kernel {} missing from module",
                    kernel
                )));
            }
        }

        info!(target: "arti-npu-runtime", "CUDA backend ready on GPU {}", ordinal);
        Ok(Self {
            name: format!("CUDA (GPU {})", ordinal),
            device,
            block_size: settings.block_size.max(1),
        })
    }

    fn launch_config(&self, n: usize) -> LaunchConfig {
        let block = self.block_size;
        let grid = (n as u32 + block - 1) / block;
        LaunchConfig {
            grid_dim: (grid, 1, 1),
            block_dim: (block, 1, 1),
            shared_mem_bytes: 0,
        }
    }
}

impl StepBackend for CudaBackend {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Gpu
    }

    fn backend_name(&self) -> &str {
        &self.name
    }

    fn step_nodes(
        &self,
        _plan: &DispatchPlan,
        params: &IzhikevichParameters,
        state: NodeState<'_>,
    ) -> Result<()> {
        state.check_lengths()?;
        let n = state.len();
        if n == 0 {
            return Ok(());
        }

        let dev = &self.device;
        let params_dev = dev
            .htod_sync_copy(&params.to_device_array())
            .map_err(|e| device_err("Failed to upload parameters", e))?;
        let input = dev
            .htod_sync_copy(state.input)
            .map_err(|e| device_err("Failed to upload input", e))?;
        let mut u = dev
            .htod_sync_copy(state.u)
            .map_err(|e| device_err("Failed to upload u", e))?;
        let mut v = dev
            .htod_sync_copy(state.v)
            .map_err(|e| device_err("Failed to upload v", e))?;
        let mut spike = dev
            .htod_sync_copy(state.spike)
            .map_err(|e| device_err("Failed to upload spike", e))?;

        let kernel = dev
            .get_func(MODULE, NODE_KERNEL)
            .ok_or_else(|| RuntimeError::DeviceFailure("Node kernel not loaded".to_string()))?;

        unsafe {
            kernel.launch(
                self.launch_config(n),
                (
                    n as i32,
                    params.family.device_tag(),
                    &params_dev,
                    &input,
                    &mut u,
                    &mut v,
                    &mut spike,
                ),
            )
        }
        .map_err(|e| device_err("Node kernel launch failed", e))?;

        dev.synchronize()
            .map_err(|e| device_err("Failed to synchronize after node kernel", e))?;

        dev.dtoh_sync_copy_into(&u, state.u)
            .map_err(|e| device_err("Failed to download u", e))?;
        dev.dtoh_sync_copy_into(&v, state.v)
            .map_err(|e| device_err("Failed to download v", e))?;
        dev.dtoh_sync_copy_into(&spike, state.spike)
            .map_err(|e| device_err("Failed to download spike", e))?;

        debug!(target: "arti-npu-runtime", "CUDA stepped {} units", n);
        Ok(())
    }

    fn step_synapses(&self, _plan: &DispatchPlan, state: SynapseState<'_>) -> Result<()> {
        state.check_lengths()?;
        let n = state.len();
        if n == 0 {
            return Ok(());
        }

        let dev = &self.device;
        let upload = |host: &[f32], what: &str| {
            dev.htod_sync_copy(host)
                .map_err(|e| device_err(&format!("Failed to upload {}", what), e))
        };
        let pre = upload(state.pre_spike, "pre_spike")?;
        let big_u = upload(state.big_u, "U")?;
        let tf = upload(state.tf, "tf")?;
        let td = upload(state.td, "td")?;
        let mut u = upload(state.u, "u")?;
        let mut x = upload(state.x, "x")?;
        let mut release = upload(state.release, "release")?;

        let kernel = dev
            .get_func(MODULE, SYNAPSE_KERNEL)
            .ok_or_else(|| RuntimeError::DeviceFailure("Synapse kernel not loaded".to_string()))?;

        unsafe {
            kernel.launch(
                self.launch_config(n),
                (n as i32, &pre, &big_u, &tf, &td, &mut u, &mut x, &mut release),
            )
        }
        .map_err(|e| device_err("Synapse kernel launch failed", e))?;

        dev.synchronize()
            .map_err(|e| device_err("Failed to synchronize after synapse kernel", e))?;

        dev.dtoh_sync_copy_into(&u, state.u)
            .map_err(|e| device_err("Failed to download u", e))?;
        dev.dtoh_sync_copy_into(&x, state.x)
            .map_err(|e| device_err("Failed to download x", e))?;
        dev.dtoh_sync_copy_into(&release, state.release)
            .map_err(|e| device_err("Failed to download release", e))?;
        Ok(())
    }
}

/// Check if a CUDA device is usable at `ordinal`
pub fn is_cuda_available(ordinal: usize) -> bool {
    CudaDevice::new(ordinal).is_ok()
}
