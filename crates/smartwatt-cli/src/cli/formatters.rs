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

//! Output formatters for CLI results.

use comfy_table::{Attribute, Cell, Color, Table, presets::UTF8_FULL};
use smartwatt_core::SlabCharge;
use smartwatt_types::{AnomalyVerdict, BillResult, DailyConsumption, PredictionResult, TariffSlab};
use std::fmt::Write;

/// Formatter for pretty ASCII tables
#[derive(Debug)]
pub struct TableFormatter;

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold))
        .collect()
}

fn slab_range(slab: &TariffSlab) -> String {
    match slab.upper_kwh {
        Some(upper) => format!("{:.0} - {:.0}", slab.lower_kwh, upper),
        None => format!("{:.0}+", slab.lower_kwh),
    }
}

impl TableFormatter {
    /// Per-slab breakdown followed by the bill totals
    pub fn format_bill(breakdown: &[SlabCharge], bill: &BillResult, period_days: u32) -> String {
        let mut output = String::new();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Slab\n(kWh)", "Rate\n(per kWh)", "Units\n(kWh)", "Charge"]));

        for line in breakdown {
            table.add_row(vec![
                Cell::new(slab_range(&line.slab)),
                Cell::new(format!("{:.2}", line.slab.rate)),
                Cell::new(format!("{:.2}", line.units_kwh)),
                Cell::new(format!("{:.2}", line.charge)),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');

        let _ = writeln!(
            output,
            "Consumption: {:.2} kWh over {period_days} days",
            bill.period_consumption
        );
        let _ = writeln!(output, "Energy charge: {:.2}", bill.energy_charge);
        let _ = writeln!(output, "Fixed charge:  {:.2}", bill.fixed_charge);
        let _ = writeln!(output, "Tax:           {:.2}", bill.tax);
        let _ = writeln!(output, "Total:         {:.2}", bill.total);

        output
    }

    /// Anomaly verdict as a key/value table
    pub fn format_verdict(verdict: &AnomalyVerdict, window_len: usize) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Field", "Value"]));

        let status = if verdict.is_anomalous {
            Cell::new("HIGH CONSUMPTION")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        } else if verdict.has_baseline() {
            Cell::new("normal").fg(Color::Green)
        } else {
            Cell::new("no baseline")
        };

        let optional = |value: Option<f64>| {
            value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2} kWh"))
        };

        table.add_row(vec![Cell::new("Status"), status]);
        table.add_row(vec![
            Cell::new("Reading"),
            Cell::new(format!("{:.2} kWh", verdict.reading_kwh)),
        ]);
        table.add_row(vec![Cell::new("Baseline"), Cell::new(optional(verdict.baseline))]);
        table.add_row(vec![Cell::new("Threshold"), Cell::new(optional(verdict.threshold))]);
        table.add_row(vec![Cell::new("Window size"), Cell::new(window_len)]);

        let mut output = table.to_string();
        output.push('\n');
        if let Some(message) = &verdict.message {
            output.push_str(message);
            output.push('\n');
        }
        output
    }

    /// Per-model predictions with the ensemble average
    pub fn format_prediction(result: &PredictionResult) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Model", "Prediction\n(kWh)", "Confidence", "Source"]));

        for (model, value) in &result.per_model {
            let source = if result.is_fallback(*model) {
                Cell::new("mean fallback").fg(Color::Yellow)
            } else {
                Cell::new("estimator")
            };
            table.add_row(vec![
                Cell::new(model),
                Cell::new(format!("{value:.2}")),
                Cell::new(format!("{:.0}%", model.confidence() * 100.0)),
                source,
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        let _ = writeln!(output, "Ensemble average: {:.2} kWh", result.ensemble_average);
        output
    }

    /// Daily consumption totals
    pub fn format_daily_usage(days: &[DailyConsumption]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&["Date", "Consumption\n(kWh)", "Readings"]));

        for day in days {
            table.add_row(vec![
                Cell::new(day.date),
                Cell::new(format!("{:.2}", day.total_kwh)),
                Cell::new(day.readings),
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartwatt_types::ModelKind;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_bill_output_contains_totals() {
        let bill = BillResult {
            energy_charge: 402.0,
            fixed_charge: 100.0,
            tax: 50.2,
            total: 552.2,
            period_consumption: 120.0,
        };
        let breakdown = vec![SlabCharge {
            slab: TariffSlab::unbounded(0.0, 2.8),
            units_kwh: 120.0,
            charge: 336.0,
        }];

        let output = TableFormatter::format_bill(&breakdown, &bill, 30);
        assert!(output.contains("0+"));
        assert!(output.contains("Total:         552.20"));
        assert!(output.contains("120.00 kWh over 30 days"));
    }

    #[test]
    fn test_prediction_marks_fallbacks() {
        let result = PredictionResult {
            per_model: BTreeMap::from([(ModelKind::Lstm, 11.6), (ModelKind::Regression, 12.4)]),
            ensemble_average: 12.0,
            fallback_models: BTreeSet::from([ModelKind::Lstm]),
        };

        let output = TableFormatter::format_prediction(&result);
        assert!(output.contains("mean fallback"));
        assert!(output.contains("LSTM"));
        assert!(output.contains("Ensemble average: 12.00 kWh"));
    }

    #[test]
    fn test_verdict_without_baseline() {
        let output = TableFormatter::format_verdict(&AnomalyVerdict::no_baseline(3.0), 0);
        assert!(output.contains("no baseline"));
        assert!(output.contains("3.00 kWh"));
    }
}
