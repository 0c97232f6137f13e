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

//! In-process estimators

use super::Estimator;
use anyhow::bail;

/// Least-squares line over the window, extrapolated one step ahead
///
/// Readings are treated as equally spaced. Negative extrapolations are
/// clamped to zero since consumption cannot go below it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendEstimator;

impl Estimator for LinearTrendEstimator {
    fn name(&self) -> &str {
        "linear-trend"
    }

    fn predict(&self, values: &[f64]) -> anyhow::Result<f64> {
        if values.len() < 2 {
            bail!(
                "linear trend needs at least 2 values, got {}",
                values.len()
            );
        }

        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, y) in values.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let next = intercept + slope * n;

        Ok(next.max(0.0))
    }
}
