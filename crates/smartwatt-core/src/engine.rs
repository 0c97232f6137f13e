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

//! Request-level operations wiring the calculators to the record store

use crate::anomaly::AnomalyDetector;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, ensure_consumption};
use crate::history::{daily_totals, recent_values};
use crate::prediction::{EstimatorRegistry, PredictionAggregator};
use crate::store::{AlertSink, PredictionSink, ReadingStore};
use crate::tariff::TariffCalculator;
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use smartwatt_types::{
    AnomalyVerdict, BillEstimate, DailyConsumption, PredictionResult, Reading, UserId,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Analytics entry point used by the ingestion and dashboard layers
///
/// Holds no per-user state: every operation reads what it needs from the
/// record store, so concurrent calls for different users never interfere.
pub struct AnalyticsEngine {
    config: EngineConfig,
    tariff: TariffCalculator,
    detector: AnomalyDetector,
    aggregator: PredictionAggregator,
    readings: Arc<dyn ReadingStore>,
    alerts: Arc<dyn AlertSink>,
    predictions: Arc<dyn PredictionSink>,
}

impl std::fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEngine")
            .field("tariff", &self.tariff)
            .field("detector", &self.detector)
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}

impl AnalyticsEngine {
    pub fn new(
        config: EngineConfig,
        registry: EstimatorRegistry,
        readings: Arc<dyn ReadingStore>,
        alerts: Arc<dyn AlertSink>,
        predictions: Arc<dyn PredictionSink>,
    ) -> Result<Self> {
        config.validate()?;

        let tariff = TariffCalculator::from_config(&config.tariff)?;
        let detector = AnomalyDetector::new(&config.anomaly)?;
        let aggregator =
            PredictionAggregator::new(registry, config.prediction.estimator_timeout());

        Ok(Self {
            config,
            tariff,
            detector,
            aggregator,
            readings,
            alerts,
            predictions,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tariff(&self) -> &TariffCalculator {
        &self.tariff
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn aggregator(&self) -> &PredictionAggregator {
        &self.aggregator
    }

    /// Store a new reading and check it against the trailing window
    ///
    /// The reading is appended before the window is read, so the baseline
    /// includes it. An anomalous verdict is forwarded to the alert sink.
    pub async fn ingest(
        &self,
        user_id: UserId,
        reading: Reading,
        now: DateTime<Utc>,
    ) -> Result<AnomalyVerdict> {
        ensure_consumption("reading", reading.value_kwh)?;
        let current = reading.value_kwh;

        self.readings
            .append(user_id, reading)
            .await
            .map_err(|e| EngineError::store(&e))?;

        let stored = self
            .readings
            .read_window(user_id, self.detector.window_start_date(now), now.date_naive())
            .await
            .map_err(|e| EngineError::store(&e))?;
        let window = self.detector.select_window(&stored, now);

        let verdict = self.detector.check(current, &window)?;

        if verdict.is_anomalous {
            warn!(
                user_id,
                reading_kwh = current,
                baseline = verdict.baseline,
                "High consumption alert"
            );
            self.alerts
                .record_alert(user_id, &verdict)
                .await
                .map_err(|e| EngineError::store(&e))?;
        } else {
            info!(
                user_id,
                reading_kwh = current,
                window = window.len(),
                "Reading ingested"
            );
        }

        Ok(verdict)
    }

    /// Bill for the consumption between `today - period_days` and today
    ///
    /// `None` uses the configured billing period.
    pub async fn estimate_bill(
        &self,
        user_id: UserId,
        today: NaiveDate,
        period_days: Option<u32>,
    ) -> Result<BillEstimate> {
        let period_days = period_days.unwrap_or(self.config.tariff.billing_period_days);
        if period_days == 0 {
            return Err(EngineError::InvalidInput(
                "billing period must be at least 1 day".to_owned(),
            ));
        }

        let start = period_start(today, period_days)?;
        let total = self
            .readings
            .sum_consumption(user_id, start, today)
            .await
            .map_err(|e| EngineError::store(&e))?;

        let bill = self.tariff.bill(total)?;
        info!(
            user_id,
            period_days,
            consumption_kwh = bill.period_consumption,
            total = bill.total,
            "Bill estimated"
        );

        Ok(BillEstimate {
            bill,
            period_days,
            start,
            end: today,
        })
    }

    /// Predict tomorrow's consumption from the most recent readings
    ///
    /// Per-model predictions are recorded for `today + 1`.
    pub async fn generate_predictions(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<PredictionResult> {
        let prediction = &self.config.prediction;

        let history = self
            .readings
            .read_window(user_id, NaiveDate::MIN, today)
            .await
            .map_err(|e| EngineError::store(&e))?;

        if history.len() < prediction.min_history {
            warn!(
                user_id,
                available = history.len(),
                required = prediction.min_history,
                "Not enough history for predictions"
            );
            return Err(EngineError::InsufficientData {
                required: prediction.min_history,
                available: history.len(),
            });
        }

        let values = recent_values(&history, prediction.history_limit);
        let result = self.aggregator.predict(&values, &prediction.models).await;

        let for_date = today + Duration::days(1);
        self.predictions
            .record_predictions(user_id, &result, for_date)
            .await
            .map_err(|e| EngineError::store(&e))?;

        info!(
            user_id,
            %for_date,
            ensemble_average = result.ensemble_average,
            fallbacks = result.fallback_models.len(),
            "Predictions generated"
        );

        Ok(result)
    }

    /// Per-date consumption totals for the last `days` days (including today)
    pub async fn daily_usage(
        &self,
        user_id: UserId,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<DailyConsumption>> {
        let start = period_start(today, days)?;
        let readings = self
            .readings
            .read_window(user_id, start, today)
            .await
            .map_err(|e| EngineError::store(&e))?;

        Ok(daily_totals(&readings))
    }
}

fn period_start(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| EngineError::InvalidInput(format!("period of {days} days is out of range")))
}
