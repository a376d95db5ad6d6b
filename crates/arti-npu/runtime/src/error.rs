// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for runtime operations

use arti_npu_neural::{ArrayId, NodeId, ParameterError};

/// Runtime errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Slot or array index outside the current length
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Identity handle is no longer registered
    #[error("{0} is not registered")]
    IdentityNotFound(NodeId),

    /// Identity belongs to a different node array
    #[error("{node} belongs to {actual}, not {expected}")]
    WrongArray {
        node: NodeId,
        expected: ArrayId,
        actual: ArrayId,
    },

    /// Array was handed a registry other than the one it was built against
    #[error("Array belongs to a different registry")]
    RegistryMismatch,

    /// A record points at an array the caller did not supply
    #[error("{0} was not supplied to this step")]
    ArrayNotFound(ArrayId),

    /// GPU probe or initialisation failed (recovered by strategy fallback)
    #[error("Device initialisation failed: {0}")]
    DeviceInitFailure(String),

    /// GPU failed while stepping
    #[error("Device failure: {0}")]
    DeviceFailure(String),

    /// Threaded batches missed the deadline; nothing was committed
    #[error("Workers did not finish within {timeout_ms} ms ({pending_batches} batches pending)")]
    WorkerTimeout {
        timeout_ms: u64,
        pending_batches: usize,
    },

    /// Worker pool could not be built or a worker died
    #[error("Worker failure: {0}")]
    WorkerFailure(String),

    /// Parameters rejected at construction
    #[error("Invalid parameter range: {0}")]
    InvalidParameterRange(#[from] ParameterError),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Bounds check shared by every slot accessor
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(RuntimeError::IndexOutOfRange { index, len })
    }
}
