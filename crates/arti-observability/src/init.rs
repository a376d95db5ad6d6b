// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for ARTI binaries
//!
//! Console output always; with the `file-logging` feature and a `log_dir`,
//! a JSON log per run:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── arti.log.2025-01-01
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingSettings};

const RUN_PREFIX: &str = "run_";

/// Keeps file writers alive; logs are flushed when it is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the level and debug-flag directives.
///
/// # Errors
/// Fails on an unparseable filter, an unwritable log directory, or when a
/// global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard> {
    let directives = match std::env::var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => settings.filter_string(),
    };
    let make_filter = || {
        EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid log filter: {}", directives))
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(make_filter()?)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(make_filter()?)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();
    #[cfg(feature = "file-logging")]
    let run_folder = match &settings.log_dir {
        Some(base_log_dir) => {
            let (layer, guard, folder) =
                file_layer(base_log_dir, settings.retention_runs, make_filter()?)?;
            layers.push(layer);
            file_guards.push(guard);
            Some(folder)
        }
        None => None,
    };
    #[cfg(not(feature = "file-logging"))]
    let run_folder: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    if settings.log_dir.is_some() && run_folder.is_none() {
        tracing::warn!("log_dir is set but file logging is not compiled in; console only");
    }
    tracing::debug!(filter = %directives, format = %settings.format, "logging initialized");

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Initialize console logging at `info` with debug flags from the process
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&LoggingSettings {
        debug_flags: crate::cli::parse_debug_flags(),
        ..Default::default()
    })
}

#[cfg(feature = "file-logging")]
fn file_layer(
    base_log_dir: &Path,
    retention_runs: usize,
    filter: EnvFilter,
) -> Result<(
    BoxedLayer,
    tracing_appender::non_blocking::WorkerGuard,
    PathBuf,
)> {
    let run_folder = base_log_dir.join(run_folder_name());
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    prune_run_folders(base_log_dir, retention_runs)?;

    let file_appender = tracing_appender::rolling::daily(&run_folder, "arti.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(filter)
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Remove the oldest `run_*` folders so at most `keep` remain.
///
/// Folder names embed a sortable timestamp, so lexical order is age order.
/// Returns the number of folders removed.
pub fn prune_run_folders(base_log_dir: &Path, keep: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        let is_run = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(RUN_PREFIX))
            .unwrap_or(false);
        if path.is_dir() && is_run {
            runs.push(path);
        }
    }
    runs.sort();

    let excess = runs.len().saturating_sub(keep);
    let mut removed = 0;
    for path in runs.iter().take(excess) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => {
                eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e)
            }
        }
    }
    Ok(removed)
}

/// Timestamped folder name for a run started now
pub fn run_folder_name() -> String {
    format!("{}{}", RUN_PREFIX, Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prune_keeps_newest_runs() {
        let dir = tempdir().unwrap();
        for name in [
            "run_20250101_120000",
            "run_20250102_120000",
            "run_20250103_120000",
            "unrelated",
        ] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let removed = prune_run_folders(dir.path(), 2).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20250101_120000").exists());
        assert!(dir.path().join("run_20250102_120000").exists());
        assert!(dir.path().join("run_20250103_120000").exists());
        assert!(dir.path().join("unrelated").exists());
    }

    #[test]
    fn test_prune_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(prune_run_folders(&dir.path().join("nope"), 1).unwrap(), 0);
    }

    #[test]
    fn test_run_folder_name_shape() {
        let name = run_folder_name();
        let stamp = name.strip_prefix(RUN_PREFIX).unwrap();
        assert_eq!(stamp.len(), "20250101_120000".len());
        assert_eq!(stamp.as_bytes()[8], b'_');
    }
}
