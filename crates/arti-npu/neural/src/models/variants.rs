// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Named node variants and their parameter presets

use core::fmt;
use core::str::FromStr;

use super::izhikevich::IzhikevichParameters;

/// Built-in variants, each resolving to a fixed parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "snake_case"))]
pub enum NodeVariant {
    /// Layer 2/3 pyramidal soma, conductance form
    RegularSpikingPyramidal,
    /// Fires only while hyperpolarized, quadratic form
    InhibitionInducedSpiking,
    RegularSpiking,
    FastSpiking,
    Chattering,
}

impl NodeVariant {
    pub const ALL: [NodeVariant; 5] = [
        NodeVariant::RegularSpikingPyramidal,
        NodeVariant::InhibitionInducedSpiking,
        NodeVariant::RegularSpiking,
        NodeVariant::FastSpiking,
        NodeVariant::Chattering,
    ];

    pub fn parameters(self) -> IzhikevichParameters {
        match self {
            NodeVariant::RegularSpikingPyramidal => IzhikevichParameters::conductance(
                0.03, -2.0, -50.0, 100.0, 100.0, 0.7, -60.0, -40.0, 35.0,
            )
            .with_conductances(3.0, 5.0),
            NodeVariant::InhibitionInducedSpiking => {
                IzhikevichParameters::quadratic(-0.02, -1.0, -60.0, 8.0, 30.0, -63.8)
            }
            NodeVariant::RegularSpiking => {
                IzhikevichParameters::quadratic(0.02, 0.2, -65.0, 8.0, 30.0, -65.0)
            }
            NodeVariant::FastSpiking => {
                IzhikevichParameters::quadratic(0.1, 0.2, -65.0, 2.0, 30.0, -65.0)
            }
            NodeVariant::Chattering => {
                IzhikevichParameters::quadratic(0.02, 0.2, -50.0, 2.0, 30.0, -65.0)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeVariant::RegularSpikingPyramidal => "regular_spiking_pyramidal",
            NodeVariant::InhibitionInducedSpiking => "inhibition_induced_spiking",
            NodeVariant::RegularSpiking => "regular_spiking",
            NodeVariant::FastSpiking => "fast_spiking",
            NodeVariant::Chattering => "chattering",
        }
    }
}

impl fmt::Display for NodeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "regular_spiking_pyramidal" | "rsp" => Ok(NodeVariant::RegularSpikingPyramidal),
            "inhibition_induced_spiking" | "iis" => Ok(NodeVariant::InhibitionInducedSpiking),
            "regular_spiking" | "rs" => Ok(NodeVariant::RegularSpiking),
            "fast_spiking" | "fs" => Ok(NodeVariant::FastSpiking),
            "chattering" | "ch" => Ok(NodeVariant::Chattering),
            _ => Err(format!("Unknown node variant: {}", s)),
        }
    }
}
