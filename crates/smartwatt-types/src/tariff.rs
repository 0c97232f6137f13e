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

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One band of a tiered (slab) tariff
///
/// A slab covers consumption in `[lower_kwh, upper_kwh)`. `upper_kwh = None`
/// means the slab is unbounded, which only the last slab of a table may be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffSlab {
    /// Lower bound of the band (kWh)
    #[serde(alias = "from")]
    pub lower_kwh: f64,

    /// Upper bound of the band (kWh), `None` = +infinity
    #[serde(alias = "to", default, skip_serializing_if = "Option::is_none")]
    pub upper_kwh: Option<f64>,

    /// Price per kWh inside this band
    pub rate: f64,
}

impl TariffSlab {
    pub const fn new(lower_kwh: f64, upper_kwh: f64, rate: f64) -> Self {
        Self {
            lower_kwh,
            upper_kwh: Some(upper_kwh),
            rate,
        }
    }

    pub const fn unbounded(lower_kwh: f64, rate: f64) -> Self {
        Self {
            lower_kwh,
            upper_kwh: None,
            rate,
        }
    }

    /// Upper bound as a number (`f64::INFINITY` for an unbounded slab)
    pub fn upper_bound(&self) -> f64 {
        self.upper_kwh.unwrap_or(f64::INFINITY)
    }

    pub fn is_unbounded(&self) -> bool {
        self.upper_kwh.is_none()
    }
}

/// Reference residential slab table (2.80 / 3.40 / 4.60 / 6.00 / 7.50 per kWh)
pub fn reference_slabs() -> Vec<TariffSlab> {
    vec![
        TariffSlab::new(0.0, 50.0, 2.80),
        TariffSlab::new(50.0, 100.0, 3.40),
        TariffSlab::new(100.0, 200.0, 4.60),
        TariffSlab::new(200.0, 500.0, 6.00),
        TariffSlab::unbounded(500.0, 7.50),
    ]
}

/// Monetary result of billing one period
///
/// All amounts are rounded to 2 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillResult {
    /// Sum of slab charges
    pub energy_charge: f64,
    pub fixed_charge: f64,
    /// Tax on (energy charge + fixed charge)
    pub tax: f64,
    pub total: f64,
    /// Consumption the bill was computed for (kWh)
    pub period_consumption: f64,
}

/// Bill together with the period it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillEstimate {
    pub bill: BillResult,
    pub period_days: u32,
    /// First day of the period (inclusive)
    pub start: NaiveDate,
    /// Last day of the period (inclusive)
    pub end: NaiveDate,
}
