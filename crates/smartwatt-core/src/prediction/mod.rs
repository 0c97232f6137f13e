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

//! Ensemble prediction of next-period consumption
//!
//! ## Architecture
//!
//! - **Estimator**: anything that turns a window of recent values into one
//!   predicted value. How it does that (regression, a network served over
//!   HTTP, ...) is invisible to the aggregator.
//! - **EstimatorRegistry**: maps each [`ModelKind`] to at most one estimator.
//!   An empty registry is valid.
//! - **PredictionAggregator**: runs the requested models and averages them.
//!
//! ## Fallback
//!
//! A model whose estimator is missing, disabled, fails, panics, times out or
//! returns a non-finite value is assigned the mean of the input window. One
//! bad estimator never fails the whole request.

pub mod estimators;
pub mod remote;

pub use estimators::LinearTrendEstimator;
pub use remote::RemoteEstimator;

use crate::config::PredictionConfig;
use crate::error::Result;
use crate::history::mean;
use smartwatt_types::{ModelKind, PredictionResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Capability every prediction model must provide
pub trait Estimator: Send + Sync {
    /// Estimator name for logging
    fn name(&self) -> &str;

    /// Predict the next value from an ordered window (oldest first)
    fn predict(&self, values: &[f64]) -> anyhow::Result<f64>;

    /// Whether the estimator can currently serve requests
    fn is_available(&self) -> bool {
        true
    }
}

/// Value used for a model that could not produce a prediction
///
/// Mean of the window, `0.0` for an empty window.
pub fn mean_fallback(values: &[f64]) -> f64 {
    mean(values).unwrap_or(0.0)
}

/// Unweighted mean of per-model outputs (`0.0` when no model was requested)
pub fn combine(per_model: &BTreeMap<ModelKind, f64>) -> f64 {
    let outputs: Vec<f64> = per_model.values().copied().collect();
    mean(&outputs).unwrap_or(0.0)
}

struct EstimatorEntry {
    estimator: Arc<dyn Estimator>,
    enabled: bool,
}

impl std::fmt::Debug for EstimatorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimatorEntry")
            .field("name", &self.estimator.name())
            .field("enabled", &self.enabled)
            .field("available", &self.estimator.is_available())
            .finish()
    }
}

/// Model -> estimator mapping
#[derive(Debug, Default)]
pub struct EstimatorRegistry {
    estimators: HashMap<ModelKind, EstimatorEntry>,
}

impl EstimatorRegistry {
    /// Registry without estimators: every model falls back to the mean
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for a deployment's prediction settings
    pub fn from_config(config: &PredictionConfig) -> Result<Self> {
        let mut registry = Self::new();

        if config.builtin_regression {
            registry.register(ModelKind::Regression, Arc::new(LinearTrendEstimator));
        }

        for remote in &config.remote {
            let estimator = RemoteEstimator::from_config(remote)?;
            registry.register(remote.model, Arc::new(estimator));
        }

        Ok(registry)
    }

    /// Register (or replace) the estimator serving `model`
    pub fn register(&mut self, model: ModelKind, estimator: Arc<dyn Estimator>) {
        debug!(model = %model, estimator = estimator.name(), "Registering estimator");
        if let Some(previous) = self.estimators.insert(
            model,
            EstimatorEntry {
                estimator,
                enabled: true,
            },
        ) {
            debug!(
                model = %model,
                replaced = previous.estimator.name(),
                "Replaced existing estimator"
            );
        }
    }

    /// Enable or disable a model's estimator
    ///
    /// Returns `false` when no estimator is registered for the model.
    pub fn set_enabled(&mut self, model: ModelKind, enabled: bool) -> bool {
        if let Some(entry) = self.estimators.get_mut(&model) {
            entry.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Estimator that should serve `model` right now, if any
    pub fn get(&self, model: ModelKind) -> Option<Arc<dyn Estimator>> {
        self.estimators
            .get(&model)
            .filter(|entry| entry.enabled && entry.estimator.is_available())
            .map(|entry| Arc::clone(&entry.estimator))
    }

    /// `(model, estimator name, usable)` for every registered estimator
    pub fn list(&self) -> Vec<(ModelKind, String, bool)> {
        let mut listed: Vec<_> = self
            .estimators
            .iter()
            .map(|(model, entry)| {
                (
                    *model,
                    entry.estimator.name().to_owned(),
                    entry.enabled && entry.estimator.is_available(),
                )
            })
            .collect();
        listed.sort_by_key(|(model, _, _)| *model);
        listed
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

/// How a single model's estimate was obtained
#[derive(Debug)]
enum Estimate {
    Value(f64),
    Unavailable,
    Failed(String),
    TimedOut,
}

/// Runs requested models and combines their outputs
#[derive(Debug)]
pub struct PredictionAggregator {
    registry: EstimatorRegistry,
    timeout: Duration,
}

impl PredictionAggregator {
    pub fn new(registry: EstimatorRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Predict with every requested model concurrently
    ///
    /// Each estimator runs on the blocking pool and gets `timeout` to answer,
    /// so the call takes at most about one timeout regardless of how many
    /// models are requested. Requested models are treated as a set.
    pub async fn predict(&self, values: &[f64], requested: &[ModelKind]) -> PredictionResult {
        let models: BTreeSet<ModelKind> = requested.iter().copied().collect();
        let window: Arc<[f64]> = Arc::from(values);
        let mut estimates: BTreeMap<ModelKind, Estimate> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for model in &models {
            let Some(estimator) = self.registry.get(*model) else {
                estimates.insert(*model, Estimate::Unavailable);
                continue;
            };

            let model = *model;
            let window = Arc::clone(&window);
            let timeout = self.timeout;
            tasks.spawn(async move {
                let call = tokio::task::spawn_blocking(move || estimator.predict(&window));
                let estimate = match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(Ok(value))) => Estimate::Value(value),
                    Ok(Ok(Err(e))) => Estimate::Failed(format!("{e:#}")),
                    Ok(Err(join_error)) => Estimate::Failed(format!("panicked: {join_error}")),
                    Err(_) => Estimate::TimedOut,
                };
                (model, estimate)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((model, estimate)) => {
                    estimates.insert(model, estimate);
                }
                Err(e) => warn!("Estimator task failed to complete: {e}"),
            }
        }

        // Anything that did not report back falls back like an unavailable model
        for model in &models {
            estimates.entry(*model).or_insert(Estimate::Unavailable);
        }

        self.resolve(values, estimates)
    }

    /// Predict with every requested model, one after another
    ///
    /// Same contract as [`Self::predict`] without the timeout, for callers
    /// outside an async runtime.
    pub fn predict_sync(&self, values: &[f64], requested: &[ModelKind]) -> PredictionResult {
        let models: BTreeSet<ModelKind> = requested.iter().copied().collect();
        let estimates = models
            .into_iter()
            .map(|model| {
                let estimate = match self.registry.get(model) {
                    None => Estimate::Unavailable,
                    Some(estimator) => {
                        match catch_unwind(AssertUnwindSafe(|| estimator.predict(values))) {
                            Ok(Ok(value)) => Estimate::Value(value),
                            Ok(Err(e)) => Estimate::Failed(format!("{e:#}")),
                            Err(_) => Estimate::Failed("panicked".to_owned()),
                        }
                    }
                };
                (model, estimate)
            })
            .collect();

        self.resolve(values, estimates)
    }

    /// Substitute the fallback where needed and average
    fn resolve(
        &self,
        values: &[f64],
        estimates: BTreeMap<ModelKind, Estimate>,
    ) -> PredictionResult {
        let fallback = mean_fallback(values);
        let mut per_model = BTreeMap::new();
        let mut fallback_models = BTreeSet::new();

        for (model, estimate) in estimates {
            let value = match estimate {
                Estimate::Value(value) if value.is_finite() => {
                    debug!(model = %model, value, "Estimator produced prediction");
                    value
                }
                Estimate::Value(value) => {
                    warn!(model = %model, value, "Estimator returned a non-finite value, using mean fallback");
                    fallback_models.insert(model);
                    fallback
                }
                Estimate::Unavailable => {
                    debug!(model = %model, "No estimator available, using mean fallback");
                    fallback_models.insert(model);
                    fallback
                }
                Estimate::Failed(reason) => {
                    warn!(model = %model, "Estimator failed ({reason}), using mean fallback");
                    fallback_models.insert(model);
                    fallback
                }
                Estimate::TimedOut => {
                    warn!(
                        model = %model,
                        timeout_ms = self.timeout.as_millis(),
                        "Estimator timed out, using mean fallback"
                    );
                    fallback_models.insert(model);
                    fallback
                }
            };
            per_model.insert(model, value);
        }

        PredictionResult {
            ensemble_average: combine(&per_model),
            per_model,
            fallback_models,
        }
    }
}
