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

//! Tiered tariff billing
//!
//! Consumption is charged slab by slab in ascending order: the first
//! `upper - lower` kWh at the first rate, the next band at the second rate and
//! so on. Fixed charge and tax are applied on top of the energy charge.
//!
//! [`compute_bill`] is the bare algorithm and accepts any slab sequence without
//! complaint. [`TariffCalculator`] is what the engine uses: it only accepts a
//! validated [`TariffTable`] and rejects negative consumption.

use crate::config::TariffConfig;
use crate::error::{EngineError, Result, ensure_consumption};
use crate::validation::ValidationResult;
use serde::{Deserialize, Serialize};
use smartwatt_types::{BillResult, TariffSlab};
use tracing::{debug, warn};

/// Slab bounds closer than this are considered contiguous
const BOUND_EPSILON: f64 = 1e-9;

/// Round a monetary amount to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Consumption attributed to one slab
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabCharge {
    pub slab: TariffSlab,
    /// kWh billed at this slab's rate
    pub units_kwh: f64,
    /// `units_kwh * rate`, unrounded
    pub charge: f64,
}

/// Walk the slabs and attribute consumption to each of them
///
/// Stops at the first slab that starts past the total consumption, so the
/// result only contains slabs that were reached.
pub fn slab_charges(total_consumption: f64, slabs: &[TariffSlab]) -> Vec<SlabCharge> {
    let mut charges = Vec::with_capacity(slabs.len());
    let mut consumed = 0.0_f64;

    for slab in slabs {
        if consumed >= total_consumption {
            break;
        }

        let slab_limit = slab.upper_bound().min(total_consumption);
        let units_kwh = (slab_limit - consumed).max(0.0);
        charges.push(SlabCharge {
            slab: *slab,
            units_kwh,
            charge: units_kwh * slab.rate,
        });
        consumed = consumed.max(slab_limit);
    }

    charges
}

/// Consumption above the last finite slab bound that no slab charges
///
/// Always zero for tables terminating in an unbounded slab.
pub fn uncharged_kwh(total_consumption: f64, slabs: &[TariffSlab]) -> f64 {
    let covered = slabs
        .iter()
        .map(TariffSlab::upper_bound)
        .fold(0.0_f64, f64::max);
    (total_consumption - covered).max(0.0)
}

/// Compute the bill for a period's total consumption
///
/// Preconditions (not checked here): `total_consumption >= 0` and a
/// contiguous, ascending slab table. A table whose last slab is bounded leaves
/// consumption above that bound uncharged; see [`uncharged_kwh`].
///
/// Amounts are accumulated unrounded and rounded to 2 decimals only in the
/// returned [`BillResult`].
pub fn compute_bill(
    total_consumption: f64,
    slabs: &[TariffSlab],
    fixed_charge: f64,
    tax_rate: f64,
) -> BillResult {
    let energy_charge: f64 = slab_charges(total_consumption, slabs)
        .iter()
        .map(|c| c.charge)
        .sum();

    let residual = uncharged_kwh(total_consumption, slabs);
    if residual > 0.0 {
        warn!(
            residual_kwh = residual,
            "Slab table has no unbounded last slab, consumption above the last bound is not charged"
        );
    }

    let subtotal = energy_charge + fixed_charge;
    let tax = subtotal * tax_rate;
    let total = subtotal + tax;

    debug!(
        total_consumption,
        energy_charge, subtotal, tax, total, "Computed tiered bill"
    );

    BillResult {
        energy_charge: round2(energy_charge),
        fixed_charge: round2(fixed_charge),
        tax: round2(tax),
        total: round2(total),
        period_consumption: total_consumption,
    }
}

/// Check a slab table for the invariants billing relies on
pub fn validate_slabs(slabs: &[TariffSlab], field: &str) -> ValidationResult {
    let mut result = ValidationResult::success();

    if slabs.is_empty() {
        result.add_error(field, "Tariff must contain at least one slab");
        return result;
    }

    if slabs[0].lower_kwh.abs() > BOUND_EPSILON {
        result.add_error(
            format!("{field}[0].lower_kwh"),
            format!("First slab must start at 0 kWh, got {}", slabs[0].lower_kwh),
        );
    }

    let last = slabs.len() - 1;
    for (idx, slab) in slabs.iter().enumerate() {
        let prefix = format!("{field}[{idx}]");

        if !slab.rate.is_finite() || slab.rate <= 0.0 {
            result.add_error(
                format!("{prefix}.rate"),
                format!("Rate must be a positive number, got {}", slab.rate),
            );
        }

        if !slab.lower_kwh.is_finite() || slab.lower_kwh < 0.0 {
            result.add_error(
                format!("{prefix}.lower_kwh"),
                format!("Lower bound must be a non-negative number, got {}", slab.lower_kwh),
            );
        }

        match slab.upper_kwh {
            Some(upper) if upper.is_nan() || upper <= slab.lower_kwh => {
                result.add_error(
                    format!("{prefix}.upper_kwh"),
                    format!(
                        "Upper bound ({upper}) must be greater than lower bound ({})",
                        slab.lower_kwh
                    ),
                );
            }
            Some(_) if idx == last => {
                result.add_error(
                    format!("{prefix}.upper_kwh"),
                    "Last slab must be unbounded so every consumption is charged",
                );
            }
            None if idx != last => {
                result.add_error(
                    format!("{prefix}.upper_kwh"),
                    "Only the last slab may be unbounded",
                );
            }
            Some(_) | None => {}
        }

        if let Some(next) = slabs.get(idx + 1)
            && let Some(upper) = slab.upper_kwh
            && (upper - next.lower_kwh).abs() > BOUND_EPSILON
        {
            let kind = if next.lower_kwh > upper { "gap" } else { "overlap" };
            result.add_error(
                format!("{field}[{}].lower_kwh", idx + 1),
                format!(
                    "Slabs must be contiguous: {kind} between {upper} and {}",
                    next.lower_kwh
                ),
            );
        }
    }

    result
}

/// Slab table that passed [`validate_slabs`]
#[derive(Debug, Clone, PartialEq)]
pub struct TariffTable {
    slabs: Vec<TariffSlab>,
}

impl TariffTable {
    pub fn new(slabs: Vec<TariffSlab>) -> Result<Self> {
        validate_slabs(&slabs, "tariff.slabs").into_result()?;
        Ok(Self { slabs })
    }

    pub fn slabs(&self) -> &[TariffSlab] {
        &self.slabs
    }
}

/// Validated tariff: slab table, fixed charge and tax rate
#[derive(Debug, Clone, PartialEq)]
pub struct TariffCalculator {
    table: TariffTable,
    fixed_charge: f64,
    tax_rate: f64,
}

impl TariffCalculator {
    pub fn new(table: TariffTable, fixed_charge: f64, tax_rate: f64) -> Result<Self> {
        if !fixed_charge.is_finite() || fixed_charge < 0.0 {
            return Err(EngineError::Configuration(format!(
                "tariff.fixed_charge must be non-negative, got {fixed_charge}"
            )));
        }
        if !tax_rate.is_finite() || tax_rate < 0.0 {
            return Err(EngineError::Configuration(format!(
                "tariff.tax_rate must be non-negative, got {tax_rate}"
            )));
        }

        Ok(Self {
            table,
            fixed_charge,
            tax_rate,
        })
    }

    pub fn from_config(config: &TariffConfig) -> Result<Self> {
        let table = TariffTable::new(config.slabs.clone())?;
        Self::new(table, config.fixed_charge, config.tax_rate)
    }

    /// Bill a period's total consumption
    pub fn bill(&self, total_kwh: f64) -> Result<BillResult> {
        ensure_consumption("total_consumption", total_kwh)?;
        Ok(compute_bill(
            total_kwh,
            self.table.slabs(),
            self.fixed_charge,
            self.tax_rate,
        ))
    }

    /// Per-slab attribution of a period's consumption
    pub fn breakdown(&self, total_kwh: f64) -> Result<Vec<SlabCharge>> {
        ensure_consumption("total_consumption", total_kwh)?;
        Ok(slab_charges(total_kwh, self.table.slabs()))
    }

    pub fn table(&self) -> &TariffTable {
        &self.table
    }

    pub fn fixed_charge(&self) -> f64 {
        self.fixed_charge
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartwatt_types::reference_slabs;

    fn assert_money(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_example_120_kwh() {
        let bill = compute_bill(120.0, &reference_slabs(), 100.0, 0.10);
        assert_money(bill.energy_charge, 402.0);
        assert_money(bill.fixed_charge, 100.0);
        assert_money(bill.tax, 50.20);
        assert_money(bill.total, 552.20);
        assert_money(bill.period_consumption, 120.0);
    }

    #[test]
    fn test_zero_consumption_pays_fixed_charge_and_tax() {
        let bill = compute_bill(0.0, &reference_slabs(), 100.0, 0.10);
        assert_money(bill.energy_charge, 0.0);
        assert_money(bill.total, round2(100.0 * 1.10));
    }

    #[test]
    fn test_exact_slab_boundary() {
        // 50 kWh falls entirely in the first slab
        let bill = compute_bill(50.0, &reference_slabs(), 0.0, 0.0);
        assert_money(bill.energy_charge, 140.0);

        // 500 kWh spans the four bounded slabs exactly
        let bill = compute_bill(500.0, &reference_slabs(), 0.0, 0.0);
        assert_money(bill.energy_charge, 140.0 + 170.0 + 460.0 + 1800.0);
    }

    #[test]
    fn test_unbounded_slab_charges_everything_above() {
        let bill = compute_bill(600.0, &reference_slabs(), 0.0, 0.0);
        assert_money(bill.energy_charge, 2570.0 + 100.0 * 7.50);
        assert_money(uncharged_kwh(600.0, &reference_slabs()), 0.0);
    }

    #[test]
    fn test_bounded_last_slab_leaves_residual_uncharged() {
        let slabs = vec![TariffSlab::new(0.0, 50.0, 2.0), TariffSlab::new(50.0, 100.0, 3.0)];
        let bill = compute_bill(130.0, &slabs, 0.0, 0.0);
        assert_money(bill.energy_charge, 100.0 + 150.0);
        assert_money(uncharged_kwh(130.0, &slabs), 30.0);
        assert_money(bill.period_consumption, 130.0);
    }

    #[test]
    fn test_total_is_monotonic_in_consumption() {
        let slabs = reference_slabs();
        let mut previous = f64::MIN;
        for step in 0..=1200 {
            let kwh = f64::from(step) * 0.5;
            let total = compute_bill(kwh, &slabs, 100.0, 0.10).total;
            assert!(total >= previous, "total decreased at {kwh} kWh");
            previous = total;
        }
    }

    #[test]
    fn test_compute_bill_is_idempotent() {
        let slabs = reference_slabs();
        let first = compute_bill(333.3, &slabs, 100.0, 0.10);
        let second = compute_bill(333.3, &slabs, 100.0, 0.10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_tables_do_not_panic() {
        let reversed: Vec<TariffSlab> = reference_slabs().into_iter().rev().collect();
        let bill = compute_bill(250.0, &reversed, 0.0, 0.0);
        assert!(bill.energy_charge.is_finite());

        let bill = compute_bill(10.0, &[], 5.0, 0.0);
        assert_money(bill.energy_charge, 0.0);
        assert_money(bill.total, 5.0);

        let bill = compute_bill(-10.0, &reference_slabs(), 0.0, 0.0);
        assert_money(bill.energy_charge, 0.0);
    }

    #[test]
    fn test_slab_charges_stop_after_consumption() {
        let charges = slab_charges(120.0, &reference_slabs());
        assert_eq!(charges.len(), 3);
        assert_money(charges[2].units_kwh, 20.0);
        assert_money(charges[2].charge, 92.0);
    }

    #[test]
    fn test_validate_reference_table() {
        let result = validate_slabs(&reference_slabs(), "tariff.slabs");
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_validate_rejects_gap_and_overlap() {
        let gap = vec![TariffSlab::new(0.0, 50.0, 2.0), TariffSlab::unbounded(60.0, 3.0)];
        let result = validate_slabs(&gap, "tariff.slabs");
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("gap"));

        let overlap = vec![TariffSlab::new(0.0, 50.0, 2.0), TariffSlab::unbounded(40.0, 3.0)];
        let result = validate_slabs(&overlap, "tariff.slabs");
        assert!(result.errors[0].message.contains("overlap"));
    }

    #[test]
    fn test_validate_rejects_bad_bounds_and_rates() {
        let slabs = vec![
            TariffSlab::new(0.0, 50.0, 0.0),
            TariffSlab::new(50.0, 40.0, 3.0),
            TariffSlab::unbounded(40.0, 4.0),
        ];
        let result = validate_slabs(&slabs, "tariff.slabs");
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"tariff.slabs[0].rate"));
        assert!(fields.contains(&"tariff.slabs[1].upper_kwh"));
    }

    #[test]
    fn test_validate_requires_unbounded_last_and_zero_start() {
        let bounded = vec![TariffSlab::new(0.0, 50.0, 2.0)];
        assert!(!validate_slabs(&bounded, "s").valid);

        let unbounded_middle = vec![TariffSlab::unbounded(0.0, 2.0), TariffSlab::unbounded(50.0, 3.0)];
        assert!(!validate_slabs(&unbounded_middle, "s").valid);

        let late_start = vec![TariffSlab::unbounded(10.0, 2.0)];
        assert!(!validate_slabs(&late_start, "s").valid);

        assert!(!validate_slabs(&[], "s").valid);
    }

    #[test]
    fn test_calculator_rejects_negative_consumption() {
        let table = TariffTable::new(reference_slabs()).unwrap();
        let calculator = TariffCalculator::new(table, 100.0, 0.10).unwrap();

        let err = calculator.bill(-1.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let bill = calculator.bill(120.0).unwrap();
        assert_money(bill.total, 552.20);
    }

    #[test]
    fn test_calculator_rejects_bad_configuration() {
        let err = TariffTable::new(vec![TariffSlab::new(0.0, 50.0, 2.0)]).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let table = TariffTable::new(reference_slabs()).unwrap();
        assert!(TariffCalculator::new(table.clone(), -1.0, 0.1).is_err());
        assert!(TariffCalculator::new(table, 100.0, -0.1).is_err());
    }
}
