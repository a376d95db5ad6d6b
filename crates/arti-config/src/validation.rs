// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem before failing so a single run reports all of them.

use crate::{ArtiConfig, ConfigError, ConfigResult};

/// Strategy names accepted in `[execution].strategy`
pub const STRATEGY_NAMES: [&str; 5] = ["auto", "gpu", "simd", "multi_threaded", "single_threaded"];

/// Level names accepted in `[logging].level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Formats accepted in `[logging].format`
pub const LOG_FORMATS: [&str; 2] = ["text", "json"];

const MAX_BLOCK_SIZE: u32 = 1024;
const WARP_SIZE: u32 = 32;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    UnknownName { field: String, value: String, allowed: &'static [&'static str] },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => {
                write!(f, "{} must be greater than 0", field)
            }
            Self::UnknownName { field, value, allowed } => {
                write!(
                    f,
                    "{} = '{}' is not one of: {}",
                    field,
                    value,
                    allowed.join(", ")
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &ArtiConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_execution(config, &mut errors);
    validate_gpu(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_execution(config: &ArtiConfig, errors: &mut Vec<ConfigValidationError>) {
    let execution = &config.execution;

    if !STRATEGY_NAMES.contains(&execution.strategy.as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "execution.strategy".to_string(),
            value: execution.strategy.clone(),
            allowed: &STRATEGY_NAMES,
        });
    }
    if execution.units_per_thread == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "execution.units_per_thread".to_string(),
        });
    }
    if execution.worker_timeout_ms == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "execution.worker_timeout_ms".to_string(),
        });
    }
}

fn validate_gpu(config: &ArtiConfig, errors: &mut Vec<ConfigValidationError>) {
    let block_size = config.gpu.block_size;

    if block_size == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "gpu.block_size".to_string(),
        });
    } else if block_size > MAX_BLOCK_SIZE {
        errors.push(ConfigValidationError::InvalidValue {
            field: "gpu.block_size".to_string(),
            reason: format!("{} exceeds the limit of {}", block_size, MAX_BLOCK_SIZE),
        });
    } else if block_size % WARP_SIZE != 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "gpu.block_size".to_string(),
            reason: format!("{} is not a multiple of {}", block_size, WARP_SIZE),
        });
    }
}

fn validate_logging(config: &ArtiConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "logging.level".to_string(),
            value: config.logging.level.clone(),
            allowed: &LOG_LEVELS,
        });
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "logging.format".to_string(),
            value: config.logging.format.clone(),
            allowed: &LOG_FORMATS,
        });
    }
}
