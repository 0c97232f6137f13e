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

//! Estimator backed by an external model service
//!
//! The service receives `POST {"model": "LSTM", "values": [...]}` and must
//! answer `{"prediction": <number>}`. Models written in any language can be
//! plugged in this way.

use super::Estimator;
use crate::config::RemoteEstimatorConfig;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use smartwatt_types::ModelKind;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    model: ModelKind,
    values: &'a [f64],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: f64,
}

/// Remote model service reached over HTTP
///
/// Each request builds its own blocking client, so `predict` must be called
/// from a blocking context (the aggregator runs it on the blocking pool).
/// Creating or dropping the estimator is fine anywhere, including inside a
/// tokio runtime.
pub struct RemoteEstimator {
    name: String,
    model: ModelKind,
    url: reqwest::Url,
    timeout: Duration,
    /// Consecutive failures
    failure_count: AtomicU32,
    /// Failures before the estimator reports itself unavailable
    max_failures: u32,
}

impl std::fmt::Debug for RemoteEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEstimator")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("failure_count", &self.failure_count.load(Ordering::Relaxed))
            .field("max_failures", &self.max_failures)
            .finish_non_exhaustive()
    }
}

impl RemoteEstimator {
    pub fn new(
        model: ModelKind,
        url: impl Into<String>,
        timeout: Duration,
        max_failures: u32,
    ) -> Result<Self> {
        let url = url.into();
        let url = reqwest::Url::parse(&url).map_err(|e| {
            EngineError::Configuration(format!("Invalid remote estimator URL '{url}': {e}"))
        })?;

        Ok(Self {
            name: format!("remote-{}", model.as_str().to_lowercase()),
            model,
            url,
            timeout,
            failure_count: AtomicU32::new(0),
            max_failures,
        })
    }

    pub fn from_config(config: &RemoteEstimatorConfig) -> Result<Self> {
        Self::new(
            config.model,
            config.url.clone(),
            Duration::from_millis(config.timeout_ms),
            config.max_failures,
        )
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Make the estimator available again after an outage
    pub fn reset_failures(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        let prev = self.failure_count.fetch_add(1, Ordering::Relaxed);
        if prev + 1 >= self.max_failures {
            warn!(
                "Estimator {} has {} consecutive failures, disabling",
                self.name,
                prev + 1
            );
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    fn request(&self, values: &[f64]) -> anyhow::Result<f64> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        let response = client
            .post(self.url.clone())
            .json(&PredictRequest {
                model: self.model,
                values,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("HTTP error {status}: {body}");
        }

        let parsed: PredictResponse = response
            .json()
            .map_err(|e| anyhow::anyhow!("Failed to parse response: {e}"))?;
        if !parsed.prediction.is_finite() {
            anyhow::bail!("Service returned non-finite prediction");
        }
        Ok(parsed.prediction)
    }
}

impl Estimator for RemoteEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.max_failures == 0 || self.failure_count.load(Ordering::Relaxed) < self.max_failures
    }

    fn predict(&self, values: &[f64]) -> anyhow::Result<f64> {
        debug!("Estimator {} requesting prediction from {}", self.name, self.url);

        match self.request(values) {
            Ok(prediction) => {
                self.record_success();
                debug!("Estimator {} returned {prediction:.2}", self.name);
                Ok(prediction)
            }
            Err(e) => {
                self.record_failure();
                error!("Estimator {} request failed: {e:#}", self.name);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(url: String, max_failures: u32) -> RemoteEstimator {
        RemoteEstimator::new(
            ModelKind::Lstm,
            url,
            Duration::from_millis(1000),
            max_failures,
        )
        .unwrap()
    }

    #[test]
    fn test_successful_prediction() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "model": "LSTM",
                "values": [10.0, 12.0]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prediction": 13.25}"#)
            .create();

        let remote = estimator(format!("{}/predict", server.url()), 3);
        let prediction = remote.predict(&[10.0, 12.0]).unwrap();

        assert!((prediction - 13.25).abs() < 1e-9);
        assert_eq!(remote.failure_count(), 0);
        assert_eq!(remote.name(), "remote-lstm");
        mock.assert();
    }

    #[test]
    fn test_http_error_counts_as_failure() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/predict")
            .with_status(503)
            .with_body("model warming up")
            .create();

        let remote = estimator(format!("{}/predict", server.url()), 3);
        let err = remote.predict(&[1.0]).unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(remote.failure_count(), 1);
        assert!(remote.is_available());
    }

    #[test]
    fn test_malformed_body_counts_as_failure() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body(r#"{"value": 3}"#)
            .create();

        let remote = estimator(format!("{}/predict", server.url()), 3);
        assert!(remote.predict(&[1.0]).is_err());
        assert_eq!(remote.failure_count(), 1);
    }

    #[test]
    fn test_disabled_after_max_failures_and_reset() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/predict")
            .with_status(500)
            .expect(2)
            .create();

        let remote = estimator(format!("{}/predict", server.url()), 2);
        assert!(remote.predict(&[1.0]).is_err());
        assert!(remote.is_available());
        assert!(remote.predict(&[1.0]).is_err());
        assert!(!remote.is_available());

        remote.reset_failures();
        assert!(remote.is_available());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = RemoteEstimator::new(ModelKind::Ann, "not a url", Duration::from_secs(1), 3)
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_created_and_dropped_inside_runtime() {
        let remote = estimator("http://127.0.0.1:9/predict".to_owned(), 3);
        assert_eq!(remote.url(), "http://127.0.0.1:9/predict");
        drop(remote);
    }
}
