// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-identity record kept by the registry

use arti_npu_neural::{ArrayId, NodeId};

/// Where a unit currently lives, plus its compartment links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Owning node array
    pub array: ArrayId,
    /// Current slot in the owning array; shifts down when earlier slots are removed
    pub slot: usize,
    pub name: String,
    pub parent: Option<NodeId>,
    pub child_left: Option<NodeId>,
    pub child_right: Option<NodeId>,
}

impl NodeRecord {
    pub fn new(array: ArrayId, slot: usize, name: impl Into<String>) -> Self {
        Self {
            array,
            slot,
            name: name.into(),
            parent: None,
            child_left: None,
            child_right: None,
        }
    }

    /// Drop every link pointing at `id`
    pub(crate) fn unlink(&mut self, id: NodeId) {
        for link in [&mut self.parent, &mut self.child_left, &mut self.child_right] {
            if *link == Some(id) {
                *link = None;
            }
        }
    }
}
