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

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single meter reading
///
/// Readings are immutable once recorded. `value_kwh` is the energy consumed
/// since the previous reading, not a cumulative meter register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Consumed energy (kWh), never negative
    pub value_kwh: f64,

    /// Calendar date the reading is billed to (UTC date of `timestamp`)
    pub calendar_date: NaiveDate,
}

impl Reading {
    /// Create a reading dated to the UTC day of its timestamp
    pub fn new(timestamp: DateTime<Utc>, value_kwh: f64) -> Self {
        Self {
            timestamp,
            value_kwh,
            calendar_date: timestamp.date_naive(),
        }
    }
}

/// Total consumption of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyConsumption {
    pub date: NaiveDate,
    pub total_kwh: f64,
    /// Number of readings that contributed to the total
    pub readings: usize,
}
