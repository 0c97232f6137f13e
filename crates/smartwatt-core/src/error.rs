// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SmartWatt.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Error types for the analytics engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient data: need at least {required} readings, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("record store error: {0}")]
    Store(String),

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EngineError {
    /// Wrap a collaborator failure
    pub fn store(err: &anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Reject negative or non-finite consumption values
pub(crate) fn ensure_consumption(field: &str, value_kwh: f64) -> Result<()> {
    if !value_kwh.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "{field} must be a finite number, got {value_kwh}"
        )));
    }
    if value_kwh < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "{field} cannot be negative, got {value_kwh} kWh"
        )));
    }
    Ok(())
}
