// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameter validation errors

/// A model constant outside the range its equations can handle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("parameter `{name}` is NaN")]
    NotANumber { name: &'static str },

    #[error("parameter `{name}` must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },

    #[error("parameter `{name}` must be > {min}, got {value}")]
    BelowExclusive {
        name: &'static str,
        min: f32,
        value: f32,
    },

    #[error("parameter `{name}` must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
}

pub type Result<T> = core::result::Result<T, ParameterError>;

/// Reject NaN and infinities
pub(crate) fn finite(name: &'static str, value: f32) -> Result<()> {
    if value.is_nan() {
        Err(ParameterError::NotANumber { name })
    } else if !value.is_finite() {
        Err(ParameterError::NotFinite { name, value })
    } else {
        Ok(())
    }
}

/// Reject NaN only; infinities are meaningful bounds
pub(crate) fn not_nan(name: &'static str, value: f32) -> Result<()> {
    if value.is_nan() {
        Err(ParameterError::NotANumber { name })
    } else {
        Ok(())
    }
}

pub(crate) fn positive(name: &'static str, value: f32) -> Result<()> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::BelowExclusive {
            name,
            min: 0.0,
            value,
        })
    }
}

pub(crate) fn within(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            min,
            max,
            value,
        })
    }
}
