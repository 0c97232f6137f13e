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

use crate::UserId;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Prediction models known to the dashboard
///
/// The set is closed; each model is served by whatever estimator is
/// registered for it (or by the mean fallback when none is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelKind {
    /// Recurrent network over the recent window
    Lstm,
    /// Statistical regression on the recent window
    Regression,
    /// Feed-forward network
    Ann,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lstm => "LSTM",
            Self::Regression => "REGRESSION",
            Self::Ann => "ANN",
        }
    }

    /// Confidence reported to users next to the model's prediction
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Lstm => 0.85,
            Self::Regression => 0.78,
            Self::Ann => 0.82,
        }
    }

    pub fn all() -> &'static [ModelKind] {
        &[Self::Lstm, Self::Regression, Self::Ann]
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LSTM" => Ok(Self::Lstm),
            "REGRESSION" => Ok(Self::Regression),
            "ANN" => Ok(Self::Ann),
            _ => Err(anyhow::anyhow!(
                "Unknown model: '{}'. Supported models: {}",
                s,
                Self::all()
                    .iter()
                    .map(ModelKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// Output of the prediction aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted next-period consumption per requested model (kWh)
    pub per_model: BTreeMap<ModelKind, f64>,

    /// Unweighted mean of `per_model`
    pub ensemble_average: f64,

    /// Models whose value is the mean fallback rather than an estimator output
    #[serde(default)]
    pub fallback_models: BTreeSet<ModelKind>,
}

impl PredictionResult {
    pub fn get(&self, model: ModelKind) -> Option<f64> {
        self.per_model.get(&model).copied()
    }

    pub fn is_fallback(&self, model: ModelKind) -> bool {
        self.fallback_models.contains(&model)
    }
}

/// Persisted per-model prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: UserId,
    pub model: ModelKind,
    pub predicted_kwh: f64,
    /// Day the prediction is for
    pub for_date: NaiveDate,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Expand an aggregated result into one record per model
    pub fn from_result(
        user_id: UserId,
        result: &PredictionResult,
        for_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Vec<Self> {
        result
            .per_model
            .iter()
            .map(|(&model, &predicted_kwh)| Self {
                user_id,
                model,
                predicted_kwh,
                for_date,
                confidence: model.confidence(),
                created_at,
            })
            .collect()
    }
}
