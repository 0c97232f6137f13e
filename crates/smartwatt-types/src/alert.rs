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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing a reading against the trailing baseline
///
/// `baseline`, `threshold` and `message` are `None` when the window was empty
/// and no baseline could be computed. `message` is only set for anomalies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub is_anomalous: bool,
    /// The reading that was checked (kWh)
    pub reading_kwh: f64,
    /// Mean of the trailing window (kWh)
    pub baseline: Option<f64>,
    /// `baseline * multiplier`
    pub threshold: Option<f64>,
    pub message: Option<String>,
}

impl AnomalyVerdict {
    /// Verdict for a reading without any history to compare against
    pub fn no_baseline(reading_kwh: f64) -> Self {
        Self {
            is_anomalous: false,
            reading_kwh,
            baseline: None,
            threshold: None,
            message: None,
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

/// Alert categories stored by the alert sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Reading above the baseline threshold
    HighConsumption,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighConsumption => "HIGH_CONSUMPTION",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted form of a positive anomaly verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub user_id: UserId,
    pub kind: AlertKind,
    pub message: String,
    pub consumption_kwh: f64,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl AlertRecord {
    /// Build an alert from a verdict, `None` unless the verdict is anomalous
    pub fn from_verdict(
        user_id: UserId,
        verdict: &AnomalyVerdict,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !verdict.is_anomalous {
            return None;
        }

        Some(Self {
            user_id,
            kind: AlertKind::HighConsumption,
            message: verdict.message.clone().unwrap_or_else(|| {
                format!("High consumption detected: {:.2} kWh", verdict.reading_kwh)
            }),
            consumption_kwh: verdict.reading_kwh,
            created_at,
            is_read: false,
        })
    }
}
