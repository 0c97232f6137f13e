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

//! Synthetic household history for demos and tests

use chrono::{Duration, NaiveDate};
use rand::Rng;
use smartwatt_types::Reading;

/// Daily household consumption range (kWh)
const DAILY_KWH_MIN: f64 = 20.0;
const DAILY_KWH_MAX: f64 = 60.0;

/// Readings per day
const READINGS_MIN: u32 = 2;
const READINGS_MAX: u32 = 4;

/// Generate readings for the `days` days before `today` (today excluded)
///
/// Each day gets 2-4 readings at random times of day that split a daily
/// total drawn from 20-60 kWh evenly. Readings are returned oldest day first,
/// in generation order within a day.
pub fn generate_sample_readings<R: Rng + ?Sized>(
    rng: &mut R,
    today: NaiveDate,
    days: u32,
) -> Vec<Reading> {
    let mut readings = Vec::new();

    for offset in (1..=days).rev() {
        let date = today - Duration::days(i64::from(offset));
        let count = rng.gen_range(READINGS_MIN..=READINGS_MAX);
        let daily_kwh = rng.gen_range(DAILY_KWH_MIN..DAILY_KWH_MAX);
        let value_kwh = daily_kwh / f64::from(count);

        for _ in 0..count {
            let hour = rng.gen_range(0..24);
            let minute = rng.gen_range(0..60);
            let Some(time) = date.and_hms_opt(hour, minute, 0) else {
                continue;
            };
            readings.push(Reading::new(time.and_utc(), value_kwh));
        }
    }

    readings
}
