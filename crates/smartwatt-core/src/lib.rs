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

//! Consumption analytics engine for SmartWatt
//!
//! Turns a household's stream of meter readings into bills, high-consumption
//! alerts and next-day consumption predictions.
//!
//! # Features
//!
//! - **Tariff Calculator**: progressive slab billing with fixed charge and tax
//! - **Anomaly Detector**: flags readings well above the trailing-window mean
//! - **Prediction Aggregator**: ensemble of pluggable estimators with a mean
//!   fallback for every model that cannot answer
//!
//! # Example
//!
//! ```ignore
//! use smartwatt_core::{AnalyticsEngine, EngineConfig, EstimatorRegistry, MemoryStore};
//!
//! let config = EngineConfig::load()?;
//! let registry = EstimatorRegistry::from_config(&config.prediction)?;
//! let store = Arc::new(MemoryStore::new());
//! let engine = AnalyticsEngine::new(config, registry, store.clone(), store.clone(), store)?;
//!
//! let verdict = engine.ingest(user_id, reading, Utc::now()).await?;
//! let estimate = engine.estimate_bill(user_id, today, None).await?;
//! ```

pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod prediction;
pub mod sample;
pub mod store;
pub mod tariff;
pub mod validation;

// Re-exports for convenience
pub use anomaly::{AnomalyDetector, detect};
pub use config::{
    AnomalyConfig, EngineConfig, PredictionConfig, RemoteEstimatorConfig, TariffConfig,
    WindowAlignment,
};
pub use engine::AnalyticsEngine;
pub use error::{EngineError, Result};
pub use ingest::MeterPayload;
pub use prediction::{Estimator, EstimatorRegistry, PredictionAggregator, mean_fallback};
pub use store::{AlertSink, MemoryStore, PredictionSink, ReadingStore};
pub use tariff::{SlabCharge, TariffCalculator, TariffTable, compute_bill};
pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};
