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

//! Engine configuration
//!
//! Every value the analytics engine depends on (slab table, charges, anomaly
//! window and multiplier, prediction models and limits) comes from here.
//! Configuration is loaded from TOML, optionally overridden from the
//! environment, and validated before any engine component is built.

use crate::error::{EngineError, Result};
use crate::tariff::validate_slabs;
use crate::validation::ValidationResult;
use serde::{Deserialize, Serialize};
use smartwatt_types::{ModelKind, TariffSlab, reference_slabs};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "SMARTWATT_CONFIG";

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "smartwatt.toml";

/// Longest accepted billing period or anomaly window (about ten years)
pub const MAX_PERIOD_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub tariff: TariffConfig,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub prediction: PredictionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffConfig {
    /// Ordered slab table; omit `upper_kwh` on the last slab
    #[serde(default = "reference_slabs")]
    pub slabs: Vec<TariffSlab>,

    /// Fixed charge per billing period
    #[serde(default = "default_fixed_charge")]
    pub fixed_charge: f64,

    /// Tax applied to energy + fixed charge (0.10 = 10%)
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,

    /// Default billing period length when the caller does not pass one
    #[serde(default = "default_billing_period_days")]
    pub billing_period_days: u32,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            slabs: reference_slabs(),
            fixed_charge: default_fixed_charge(),
            tax_rate: default_tax_rate(),
            billing_period_days: default_billing_period_days(),
        }
    }
}

fn default_fixed_charge() -> f64 {
    100.0
}

fn default_tax_rate() -> f64 {
    0.10
}

fn default_billing_period_days() -> u32 {
    30
}

/// How the anomaly baseline window is cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAlignment {
    /// Whole calendar days: from `today - window_days` through today
    #[default]
    Calendar,
    /// Exactly `window_days * 24h` back from the current instant
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Length of the trailing baseline window
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// A reading above `baseline * multiplier` is anomalous
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default)]
    pub alignment: WindowAlignment,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            multiplier: default_multiplier(),
            alignment: WindowAlignment::default(),
        }
    }
}

fn default_window_days() -> u32 {
    7
}

fn default_multiplier() -> f64 {
    1.3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Models evaluated for every prediction request
    #[serde(default = "default_models")]
    pub models: Vec<ModelKind>,

    /// Readings required before predictions are offered
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    /// Most recent readings passed to the estimators
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Per-estimator time budget; the mean fallback is used once it expires
    #[serde(default = "default_estimator_timeout_ms")]
    pub estimator_timeout_ms: u64,

    /// Serve REGRESSION with the built-in linear trend estimator
    #[serde(default = "default_true")]
    pub builtin_regression: bool,

    /// Externally hosted estimators
    #[serde(default)]
    pub remote: Vec<RemoteEstimatorConfig>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            min_history: default_min_history(),
            history_limit: default_history_limit(),
            estimator_timeout_ms: default_estimator_timeout_ms(),
            builtin_regression: true,
            remote: Vec::new(),
        }
    }
}

impl PredictionConfig {
    pub fn estimator_timeout(&self) -> Duration {
        Duration::from_millis(self.estimator_timeout_ms)
    }
}

fn default_models() -> Vec<ModelKind> {
    ModelKind::all().to_vec()
}

fn default_min_history() -> usize {
    5
}

fn default_history_limit() -> usize {
    30
}

fn default_estimator_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// An estimator reachable over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEstimatorConfig {
    pub model: ModelKind,

    /// Endpoint receiving `{"model": ..., "values": [...]}`
    pub url: String,

    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,

    /// Consecutive failures before the estimator disables itself
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

fn default_remote_timeout_ms() -> u64 {
    1500
}

fn default_max_failures() -> u32 {
    3
}

impl EngineConfig {
    /// Load configuration for a deployment
    ///
    /// Order: file named by `SMARTWATT_CONFIG`, then `smartwatt.toml` in the
    /// working directory, then built-in defaults. Environment overrides are
    /// applied on top and the result is validated.
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let config = Self::parse_file(Path::new(&path))?;
            info!(path = %path, "Loaded configuration");
            config
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            let config = Self::parse_file(Path::new(DEFAULT_CONFIG_FILE))?;
            info!(path = DEFAULT_CONFIG_FILE, "Loaded configuration");
            config
        } else {
            warn!("No configuration file found, using defaults with environment overrides");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::parse_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `SMARTWATT_*` overrides looked up through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("SMARTWATT_FIXED_CHARGE")
            && let Ok(charge) = value.parse::<f64>()
        {
            self.tariff.fixed_charge = charge;
        }

        if let Some(value) = lookup("SMARTWATT_TAX_RATE")
            && let Ok(rate) = value.parse::<f64>()
        {
            self.tariff.tax_rate = rate;
        }

        if let Some(value) = lookup("SMARTWATT_ANOMALY_MULTIPLIER")
            && let Ok(multiplier) = value.parse::<f64>()
        {
            self.anomaly.multiplier = multiplier;
        }

        if let Some(value) = lookup("SMARTWATT_ANOMALY_WINDOW_DAYS")
            && let Ok(days) = value.parse::<u32>()
        {
            self.anomaly.window_days = days;
        }

        if let Some(value) = lookup("SMARTWATT_MIN_HISTORY")
            && let Ok(min_history) = value.parse::<usize>()
        {
            self.prediction.min_history = min_history;
        }
    }

    /// Validate with field-level errors and warnings
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        // ============= Tariff =============
        result.merge(validate_slabs(&self.tariff.slabs, "tariff.slabs"));
        if !self.tariff.fixed_charge.is_finite() || self.tariff.fixed_charge < 0.0 {
            result.add_error("tariff.fixed_charge", "Fixed charge cannot be negative");
        }
        if !self.tariff.tax_rate.is_finite() || self.tariff.tax_rate < 0.0 {
            result.add_error("tariff.tax_rate", "Tax rate cannot be negative");
        } else if self.tariff.tax_rate > 1.0 {
            result.add_warning(
                "tariff.tax_rate",
                format!(
                    "Tax rate {} is above 100%, expected a fraction such as 0.10",
                    self.tariff.tax_rate
                ),
            );
        }
        if self.tariff.billing_period_days == 0 {
            result.add_error(
                "tariff.billing_period_days",
                "Billing period must be at least 1 day",
            );
        } else if self.tariff.billing_period_days > MAX_PERIOD_DAYS {
            result.add_error(
                "tariff.billing_period_days",
                format!(
                    "Billing period cannot exceed {MAX_PERIOD_DAYS} days, got {}",
                    self.tariff.billing_period_days
                ),
            );
        }

        // ============= Anomaly =============
        if self.anomaly.window_days == 0 {
            result.add_error("anomaly.window_days", "Window must be at least 1 day");
        } else if self.anomaly.window_days > MAX_PERIOD_DAYS {
            result.add_error(
                "anomaly.window_days",
                format!(
                    "Window cannot exceed {MAX_PERIOD_DAYS} days, got {}",
                    self.anomaly.window_days
                ),
            );
        }
        if !self.anomaly.multiplier.is_finite() || self.anomaly.multiplier <= 1.0 {
            result.add_error(
                "anomaly.multiplier",
                format!(
                    "Multiplier must be greater than 1, got {}",
                    self.anomaly.multiplier
                ),
            );
        }

        // ============= Prediction =============
        let prediction = &self.prediction;
        if prediction.models.is_empty() {
            result.add_error("prediction.models", "At least one model is required");
        }
        let mut seen = HashSet::new();
        for model in &prediction.models {
            if !seen.insert(*model) {
                result.add_error(
                    "prediction.models",
                    format!("Model {model} is listed more than once"),
                );
            }
        }
        if prediction.min_history == 0 {
            result.add_error(
                "prediction.min_history",
                "Minimum history must be at least 1 reading",
            );
        }
        if prediction.history_limit < prediction.min_history {
            result.add_error(
                "prediction.history_limit",
                format!(
                    "History limit ({}) cannot be below minimum history ({})",
                    prediction.history_limit, prediction.min_history
                ),
            );
        }
        if prediction.estimator_timeout_ms == 0 {
            result.add_error(
                "prediction.estimator_timeout_ms",
                "Estimator timeout must be at least 1 ms",
            );
        } else if prediction.estimator_timeout_ms > 60_000 {
            result.add_warning(
                "prediction.estimator_timeout_ms",
                format!(
                    "Estimator timeout is very high ({} ms), predictions may be slow",
                    prediction.estimator_timeout_ms
                ),
            );
        }

        for (idx, remote) in prediction.remote.iter().enumerate() {
            let prefix = format!("prediction.remote[{idx}]");
            if remote.url.trim().is_empty() {
                result.add_error(format!("{prefix}.url"), "Remote estimator URL cannot be empty");
            } else if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
                result.add_error(
                    format!("{prefix}.url"),
                    format!("Remote estimator URL must be http(s), got '{}'", remote.url),
                );
            }
            if remote.timeout_ms == 0 {
                result.add_error(
                    format!("{prefix}.timeout_ms"),
                    "Remote estimator timeout must be at least 1 ms",
                );
            }
            if !prediction.models.contains(&remote.model) {
                result.add_warning(
                    format!("{prefix}.model"),
                    format!(
                        "Remote estimator for {} is configured but the model is not requested",
                        remote.model
                    ),
                );
            }
        }

        result
    }

    /// Validate, logging warnings and failing on the first error
    pub fn validate(&self) -> Result<()> {
        self.validate_detailed().into_result()
    }

    /// Pretty TOML representation (effective configuration dump)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Configuration(format!("Failed to serialize config: {e}")))
    }
}
