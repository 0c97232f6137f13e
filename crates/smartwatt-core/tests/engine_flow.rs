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

//! End-to-end flows through the analytics engine with the in-memory store

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use smartwatt_core::prediction::Estimator;
use smartwatt_core::{
    AnalyticsEngine, EngineConfig, EngineError, EstimatorRegistry, MemoryStore, ReadingStore,
};
use smartwatt_types::{AlertKind, ModelKind, Reading};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("smartwatt_core=debug")
        .try_init();
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 21, 18, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn engine_with(registry: EstimatorRegistry) -> (AnalyticsEngine, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let engine = AnalyticsEngine::new(
        EngineConfig::default(),
        registry,
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .unwrap();
    (engine, store)
}

async fn seed_daily(store: &MemoryStore, user_id: u64, values: &[f64]) {
    let days = values.len() as i64;
    for (i, value) in values.iter().enumerate() {
        let ts = now() - Duration::days(days - i as i64) + Duration::hours(1);
        store.append(user_id, Reading::new(ts, *value)).await.unwrap();
    }
}

struct Failing;

impl Estimator for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn predict(&self, _values: &[f64]) -> anyhow::Result<f64> {
        anyhow::bail!("not trained")
    }
}

#[tokio::test]
async fn test_high_reading_raises_alert() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    seed_daily(&store, 1, &[10.0; 5]).await;

    // Window holds five 10 kWh readings plus this one: mean 15, threshold 19.5
    let verdict = engine
        .ingest(1, Reading::new(now(), 40.0), now())
        .await
        .unwrap();

    assert!(verdict.is_anomalous);
    assert!((verdict.baseline.unwrap() - 15.0).abs() < 1e-9);
    assert_eq!(
        verdict.message.as_deref(),
        Some("High consumption detected: 40.00 kWh (30% above average)")
    );

    let alerts = store.alerts(1);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::HighConsumption);
    assert!((alerts[0].consumption_kwh - 40.0).abs() < 1e-9);

    let verdict = engine
        .ingest(1, Reading::new(now() + Duration::minutes(5), 12.0), now())
        .await
        .unwrap();
    assert!(!verdict.is_anomalous);
    assert_eq!(store.alerts(1).len(), 1);
}

#[tokio::test]
async fn test_first_reading_is_never_anomalous() {
    let (engine, store) = engine_with(EstimatorRegistry::new());

    let verdict = engine
        .ingest(2, Reading::new(now(), 55.0), now())
        .await
        .unwrap();

    assert!(!verdict.is_anomalous);
    assert!(store.alerts(2).is_empty());
    assert_eq!(store.reading_count(2), 1);
}

#[tokio::test]
async fn test_readings_outside_window_do_not_count() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    // Old readings are far below, but outside the 7 day window
    let old = now() - Duration::days(20);
    for i in 0..5 {
        store
            .append(3, Reading::new(old + Duration::hours(i), 1.0))
            .await
            .unwrap();
    }
    seed_daily(&store, 3, &[30.0, 32.0]).await;

    let verdict = engine
        .ingest(3, Reading::new(now(), 35.0), now())
        .await
        .unwrap();
    assert!(!verdict.is_anomalous);
}

#[tokio::test]
async fn test_bill_for_period() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    seed_daily(&store, 4, &[40.0, 30.0, 50.0]).await;
    // Outside the default 30 day period
    store
        .append(4, Reading::new(now() - Duration::days(45), 500.0))
        .await
        .unwrap();

    let estimate = engine.estimate_bill(4, today(), None).await.unwrap();
    assert_eq!(estimate.period_days, 30);
    assert_eq!(estimate.end, today());
    assert_eq!(estimate.start, today() - Duration::days(30));
    assert!((estimate.bill.period_consumption - 120.0).abs() < 1e-9);
    assert!((estimate.bill.energy_charge - 402.0).abs() < 1e-9);
    assert!((estimate.bill.tax - 50.2).abs() < 1e-9);
    assert!((estimate.bill.total - 552.2).abs() < 1e-9);

    let estimate = engine.estimate_bill(4, today(), Some(60)).await.unwrap();
    assert!((estimate.bill.period_consumption - 620.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_bill_without_readings_is_fixed_charge_with_tax() {
    let (engine, _) = engine_with(EstimatorRegistry::new());

    let estimate = engine.estimate_bill(5, today(), None).await.unwrap();
    assert!((estimate.bill.energy_charge).abs() < 1e-9);
    assert!((estimate.bill.total - 110.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_predictions_need_history() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    seed_daily(&store, 6, &[10.0, 12.0]).await;

    let err = engine.generate_predictions(6, today()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientData {
            required: 5,
            available: 2
        }
    ));
    assert!(store.predictions(6).is_empty());
}

#[tokio::test]
async fn test_predictions_fall_back_to_mean() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    seed_daily(&store, 7, &[10.0, 12.0, 11.0, 13.0, 12.0]).await;

    let result = engine.generate_predictions(7, today()).await.unwrap();
    for model in ModelKind::all() {
        assert!((result.get(*model).unwrap() - 11.6).abs() < 1e-9);
    }
    assert!((result.ensemble_average - 11.6).abs() < 1e-9);

    let records = store.predictions(7);
    assert_eq!(records.len(), 3);
    let tomorrow = today() + Duration::days(1);
    assert!(records.iter().all(|r| r.for_date == tomorrow));
    let lstm = records.iter().find(|r| r.model == ModelKind::Lstm).unwrap();
    assert!((lstm.confidence - 0.85).abs() < 1e-9);
}

#[tokio::test]
async fn test_predictions_survive_a_failing_model() {
    let mut registry =
        EstimatorRegistry::from_config(&EngineConfig::default().prediction).unwrap();
    registry.register(ModelKind::Ann, Arc::new(Failing));
    let (engine, store) = engine_with(registry);
    seed_daily(&store, 8, &[10.0, 12.0, 14.0, 16.0, 18.0]).await;

    let result = engine.generate_predictions(8, today()).await.unwrap();

    // Regression extrapolates the trend, ANN and LSTM fall back to the mean
    assert!((result.get(ModelKind::Regression).unwrap() - 20.0).abs() < 1e-9);
    assert!((result.get(ModelKind::Ann).unwrap() - 14.0).abs() < 1e-9);
    assert!((result.get(ModelKind::Lstm).unwrap() - 14.0).abs() < 1e-9);
    assert!((result.ensemble_average - 16.0).abs() < 1e-9);
    assert!(result.is_fallback(ModelKind::Ann));
    assert!(!result.is_fallback(ModelKind::Regression));
}

#[tokio::test]
async fn test_daily_usage() {
    let (engine, store) = engine_with(EstimatorRegistry::new());
    seed_daily(&store, 9, &[5.0, 6.0, 7.0]).await;
    store
        .append(9, Reading::new(now() - Duration::days(1) + Duration::hours(3), 1.5))
        .await
        .unwrap();

    let usage = engine.daily_usage(9, today(), 7).await.unwrap();
    assert_eq!(usage.len(), 3);
    assert!((usage[2].total_kwh - 8.5).abs() < 1e-9);
    assert_eq!(usage[2].readings, 2);
}
