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

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use smartwatt_types::{
    AlertRecord, AnomalyVerdict, PredictionRecord, PredictionResult, Reading, UserId,
};
use std::collections::HashMap;

// ============= Collaborator Traits =============

/// Source of meter readings per user
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a reading
    async fn append(&self, user_id: UserId, reading: Reading) -> Result<()>;

    /// Readings whose calendar date falls in `[start, end]`, ascending by timestamp
    async fn read_window(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Reading>>;

    /// Total consumption over `[start, end]` (inclusive dates)
    async fn sum_consumption(&self, user_id: UserId, start: NaiveDate, end: NaiveDate)
    -> Result<f64>;
}

/// Receiver of high-consumption alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn record_alert(&self, user_id: UserId, verdict: &AnomalyVerdict) -> Result<()>;
}

/// Receiver of per-model predictions
#[async_trait]
pub trait PredictionSink: Send + Sync {
    async fn record_predictions(
        &self,
        user_id: UserId,
        result: &PredictionResult,
        for_date: NaiveDate,
    ) -> Result<()>;
}

// ============= In-memory implementation =============

/// Process-local store implementing every collaborator trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: RwLock<HashMap<UserId, Vec<Reading>>>,
    alerts: RwLock<HashMap<UserId, Vec<AlertRecord>>>,
    predictions: RwLock<HashMap<UserId, Vec<PredictionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts recorded for a user, oldest first
    pub fn alerts(&self, user_id: UserId) -> Vec<AlertRecord> {
        self.alerts.read().get(&user_id).cloned().unwrap_or_default()
    }

    /// Prediction records for a user, oldest first
    pub fn predictions(&self, user_id: UserId) -> Vec<PredictionRecord> {
        self.predictions
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reading_count(&self, user_id: UserId) -> usize {
        self.readings.read().get(&user_id).map_or(0, Vec::len)
    }

    fn readings_between(&self, user_id: UserId, start: NaiveDate, end: NaiveDate) -> Vec<Reading> {
        let guard = self.readings.read();
        let mut window: Vec<Reading> = guard
            .get(&user_id)
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| r.calendar_date >= start && r.calendar_date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        window.sort_by_key(|r| r.timestamp);
        window
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn append(&self, user_id: UserId, reading: Reading) -> Result<()> {
        self.readings.write().entry(user_id).or_default().push(reading);
        Ok(())
    }

    async fn read_window(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Reading>> {
        Ok(self.readings_between(user_id, start, end))
    }

    async fn sum_consumption(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64> {
        Ok(self
            .readings_between(user_id, start, end)
            .iter()
            .map(|r| r.value_kwh)
            .sum())
    }
}

#[async_trait]
impl AlertSink for MemoryStore {
    async fn record_alert(&self, user_id: UserId, verdict: &AnomalyVerdict) -> Result<()> {
        if let Some(alert) = AlertRecord::from_verdict(user_id, verdict, Utc::now()) {
            self.alerts.write().entry(user_id).or_default().push(alert);
        }
        Ok(())
    }
}

#[async_trait]
impl PredictionSink for MemoryStore {
    async fn record_predictions(
        &self,
        user_id: UserId,
        result: &PredictionResult,
        for_date: NaiveDate,
    ) -> Result<()> {
        let records = PredictionRecord::from_result(user_id, result, for_date, Utc::now());
        self.predictions
            .write()
            .entry(user_id)
            .or_default()
            .extend(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use smartwatt_types::{AlertKind, ModelKind};
    use std::collections::{BTreeMap, BTreeSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_read_window_is_inclusive_and_sorted() {
        let store = MemoryStore::new();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        for (offset, value) in [(5, 5.0), (0, 1.0), (2, 3.0), (1, 2.0), (9, 9.0)] {
            store
                .append(1, Reading::new(base + Duration::days(offset), value))
                .await
                .unwrap();
        }
        store.append(2, Reading::new(base, 100.0)).await.unwrap();

        let window = store.read_window(1, date(2026, 3, 1), date(2026, 3, 6)).await.unwrap();
        let values: Vec<f64> = window.iter().map(|r| r.value_kwh).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 5.0]);

        let total = store
            .sum_consumption(1, date(2026, 3, 2), date(2026, 3, 10))
            .await
            .unwrap();
        assert!((total - 19.0).abs() < 1e-9);
        assert_eq!(store.reading_count(1), 5);
        assert_eq!(store.reading_count(3), 0);
    }

    #[tokio::test]
    async fn test_only_anomalous_verdicts_become_alerts() {
        let store = MemoryStore::new();

        store
            .record_alert(7, &AnomalyVerdict::no_baseline(4.0))
            .await
            .unwrap();
        assert!(store.alerts(7).is_empty());

        let verdict = AnomalyVerdict {
            is_anomalous: true,
            reading_kwh: 14.0,
            baseline: Some(10.0),
            threshold: Some(13.0),
            message: Some("High consumption detected: 14.00 kWh (30% above average)".to_owned()),
        };
        store.record_alert(7, &verdict).await.unwrap();

        let alerts = store.alerts(7);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::HighConsumption);
        assert!(!alerts[0].is_read);
    }

    #[tokio::test]
    async fn test_predictions_are_expanded_per_model() {
        let store = MemoryStore::new();
        let result = PredictionResult {
            per_model: BTreeMap::from([(ModelKind::Lstm, 12.0), (ModelKind::Ann, 11.0)]),
            ensemble_average: 11.5,
            fallback_models: BTreeSet::new(),
        };

        store
            .record_predictions(3, &result, date(2026, 3, 2))
            .await
            .unwrap();

        let records = store.predictions(3);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.for_date == date(2026, 3, 2)));
    }
}
