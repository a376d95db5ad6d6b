// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-arti-npu-runtime` or `--debug-all`, plus the
//! `ARTI_DEBUG` environment variable.

use std::collections::HashMap;
use std::env;

use crate::KNOWN_CRATES;

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use arti_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-arti-npu-runtime".to_string()]);
/// assert!(flags.is_enabled("arti-npu-runtime"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: HashMap<String, bool>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate. Other arguments are ignored.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    /// Merge an `ARTI_DEBUG` style value: "all" or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string(), true);
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `tracing::Level::DEBUG` if enabled, `tracing::Level::INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Build an `EnvFilter` directive string.
    ///
    /// Explicit targets use the crate name ("arti-npu-runtime") while
    /// unannotated events use the module path ("arti_npu_runtime"), so both
    /// forms are enabled: "arti-npu-runtime=debug,arti_npu_runtime=debug,info".
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters = Vec::new();
        for name in self.enabled_crates.keys() {
            filters.push(format!("{}=debug", name));
            let module = name.replace('-', "_");
            if module != *name {
                filters.push(format!("{}=debug", module));
            }
        }
        filters.sort();
        filters.push(base_level.to_ascii_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `ARTI_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var("ARTI_DEBUG") {
        flags.merge_env_value(&value);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  ARTI_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  ARTI_DEBUG=all                              Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-arti-npu-runtime".to_string()]);
        assert!(flags.is_enabled("arti-npu-runtime"));
        assert!(!flags.is_enabled("arti-config"));
    }

    #[test]
    fn test_unrelated_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "strategy_compare".to_string(),
            "--units".to_string(),
            "1000".to_string(),
        ]);
        assert!(!flags.any_enabled());
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_env_value() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value("arti-config, arti-npu-neural,");
        assert!(flags.is_enabled("arti-config"));
        assert!(flags.is_enabled("arti-npu-neural"));
        assert_eq!(flags.enabled_crates.len(), 2);

        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value("all");
        assert_eq!(flags.enabled_crates.len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-arti-npu-runtime".to_string(),
            "--debug-arti-config".to_string(),
        ]);
        assert_eq!(
            flags.to_filter_string("INFO"),
            "arti-config=debug,arti-npu-runtime=debug,arti_config=debug,arti_npu_runtime=debug,info"
        );
        assert_eq!(CrateDebugFlags::default().to_filter_string("warn"), "warn");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-arti-npu-runtime".to_string()]);
        assert_eq!(flags.log_level("arti-npu-runtime"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("arti-config"), tracing::Level::INFO);
    }
}
