// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # arti-observability
//!
//! Logging initialization for ARTI binaries and tests, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: Daily-rotated JSON log files under a per-run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known ARTI crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "arti-neural",
    "arti-npu-neural",
    "arti-npu-runtime",
    "arti-config",
    "arti-observability",
];
