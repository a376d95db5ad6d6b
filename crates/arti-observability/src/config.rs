// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging settings types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::CrateDebugFlags;

/// Console and file output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format '{0}' (expected text or json)")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Everything [`crate::init_logging`] needs
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Default level for every target (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Base directory for log files; console only when `None`
    pub log_dir: Option<PathBuf>,
    /// Number of run folders kept under `log_dir`
    pub retention_runs: usize,
    pub debug_flags: CrateDebugFlags,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            retention_runs: 10,
            debug_flags: CrateDebugFlags::default(),
        }
    }
}

impl LoggingSettings {
    /// `EnvFilter` directive string: debug crates first, then the base level
    pub fn filter_string(&self) -> String {
        self.debug_flags.to_filter_string(&self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_filter_string_uses_level() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.filter_string(), "warn");
    }
}
