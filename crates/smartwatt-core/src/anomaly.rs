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

//! High-consumption detection against a trailing baseline

use crate::config::{AnomalyConfig, MAX_PERIOD_DAYS, WindowAlignment};
use crate::error::{EngineError, Result, ensure_consumption};
use crate::history::mean;
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use smartwatt_types::{AnomalyVerdict, Reading};
use tracing::debug;

/// Compare a reading against the mean of a trailing window
///
/// An empty window yields a verdict without baseline that is never anomalous.
pub fn detect(
    current_reading: f64,
    recent_window: &[Reading],
    high_consumption_multiplier: f64,
) -> AnomalyVerdict {
    let values: Vec<f64> = recent_window.iter().map(|r| r.value_kwh).collect();
    let Some(baseline) = mean(&values) else {
        return AnomalyVerdict::no_baseline(current_reading);
    };

    let threshold = baseline * high_consumption_multiplier;
    let is_anomalous = current_reading > threshold;

    debug!(
        current_reading,
        baseline,
        threshold,
        window = recent_window.len(),
        is_anomalous,
        "Anomaly check"
    );

    let message = is_anomalous.then(|| {
        format!(
            "High consumption detected: {current_reading:.2} kWh ({}% above average)",
            margin_percent(high_consumption_multiplier)
        )
    });

    AnomalyVerdict {
        is_anomalous,
        reading_kwh: current_reading,
        baseline: Some(baseline),
        threshold: Some(threshold),
        message,
    }
}

/// Margin above the baseline expressed in whole percent (1.3 -> 30)
#[expect(clippy::cast_possible_truncation)]
fn margin_percent(multiplier: f64) -> i64 {
    ((multiplier - 1.0) * 100.0).round() as i64
}

/// Configured detector: window length, multiplier and window alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    window_days: u32,
    multiplier: f64,
    alignment: WindowAlignment,
}

impl AnomalyDetector {
    pub fn new(config: &AnomalyConfig) -> Result<Self> {
        if config.window_days == 0 || config.window_days > MAX_PERIOD_DAYS {
            return Err(EngineError::Configuration(format!(
                "anomaly.window_days must be between 1 and {MAX_PERIOD_DAYS}, got {}",
                config.window_days
            )));
        }
        if !config.multiplier.is_finite() || config.multiplier <= 1.0 {
            return Err(EngineError::Configuration(format!(
                "anomaly.multiplier must be greater than 1, got {}",
                config.multiplier
            )));
        }

        Ok(Self {
            window_days: config.window_days,
            multiplier: config.multiplier,
            alignment: config.alignment,
        })
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn rolling_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.window_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// First calendar date the window can touch
    ///
    /// Used to bound the record store query; [`Self::select_window`] trims
    /// the exact window afterwards. Saturates at the earliest representable
    /// date near the edge of the calendar.
    pub fn window_start_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match self.alignment {
            WindowAlignment::Calendar => now
                .date_naive()
                .checked_sub_days(Days::new(u64::from(self.window_days)))
                .unwrap_or(NaiveDate::MIN),
            WindowAlignment::Rolling => self.rolling_start(now).date_naive(),
        }
    }

    /// Keep only the readings inside the trailing window ending at `now`
    pub fn select_window(&self, readings: &[Reading], now: DateTime<Utc>) -> Vec<Reading> {
        match self.alignment {
            WindowAlignment::Calendar => {
                let start = self.window_start_date(now);
                let today = now.date_naive();
                readings
                    .iter()
                    .filter(|r| r.calendar_date >= start && r.calendar_date <= today)
                    .cloned()
                    .collect()
            }
            WindowAlignment::Rolling => {
                let start = self.rolling_start(now);
                readings
                    .iter()
                    .filter(|r| r.timestamp >= start && r.timestamp <= now)
                    .cloned()
                    .collect()
            }
        }
    }

    /// Validate the reading and window, then run [`detect`] with the configured multiplier
    pub fn check(&self, current_reading: f64, recent_window: &[Reading]) -> Result<AnomalyVerdict> {
        ensure_consumption("current_reading", current_reading)?;
        for reading in recent_window {
            ensure_consumption("recent_window", reading.value_kwh)?;
        }
        Ok(detect(current_reading, recent_window, self.multiplier))
    }
}
