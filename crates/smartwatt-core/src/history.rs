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

use smartwatt_types::{DailyConsumption, Reading};
use std::collections::BTreeMap;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum readings per calendar date
///
/// # Returns
/// One entry per date that has readings, oldest first
pub fn daily_totals(readings: &[Reading]) -> Vec<DailyConsumption> {
    let mut by_date: BTreeMap<_, (f64, usize)> = BTreeMap::new();
    for reading in readings {
        let entry = by_date.entry(reading.calendar_date).or_insert((0.0, 0));
        entry.0 += reading.value_kwh;
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (total_kwh, readings))| DailyConsumption {
            date,
            total_kwh,
            readings,
        })
        .collect()
}

/// Values of the last `limit` readings in timestamp order
pub fn recent_values(readings: &[Reading], limit: usize) -> Vec<f64> {
    let mut sorted: Vec<&Reading> = readings.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let skip = sorted.len().saturating_sub(limit);
    sorted.into_iter().skip(skip).map(|r| r.value_kwh).collect()
}
