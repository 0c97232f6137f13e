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

//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "smartwatt")]
#[command(author, version, about = "SmartWatt consumption analytics")]
#[command(
    long_about = "Billing, anomaly checks and consumption predictions for household meters.\n\
    \nConfiguration is read from --config, else from the file named by SMARTWATT_CONFIG,\n\
    else from ./smartwatt.toml, else built-in defaults.\n\
    \nExamples:\n  \
    smartwatt bill --kwh 120                  # Bill 120 kWh with the configured tariff\n  \
    smartwatt check --current 14 --window 8,12,9,11,10\n  \
    smartwatt predict --values 10,12,11,13,12 # Ensemble prediction\n  \
    smartwatt demo --seed 42                  # End-to-end run on sample data"
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute a bill for a period's total consumption
    #[command(
        long_about = "Apply the tariff slabs, fixed charge and tax to a consumption total.\n\
        \nExamples:\n  \
        smartwatt bill --kwh 120\n  \
        smartwatt bill --kwh 640 --days 31"
    )]
    Bill(BillArgs),

    /// Check a reading against a trailing window of readings
    #[command(
        long_about = "Compare a reading against the mean of the given window times the\n\
        configured multiplier. An empty window never produces an alert.\n\
        \nExamples:\n  \
        smartwatt check --current 14 --window 8,12,9,11,10"
    )]
    Check(CheckArgs),

    /// Predict the next value of a consumption series
    #[command(
        long_about = "Run the configured estimators over the given values and average them.\n\
        Models without a working estimator use the mean of the values.\n\
        \nExamples:\n  \
        smartwatt predict --values 10,12,11,13,12\n  \
        smartwatt predict --values 10,12,11,13,12 --models lstm,regression"
    )]
    Predict(PredictArgs),

    /// Run ingestion, billing and prediction on generated sample data
    Demo(DemoArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Args)]
pub struct BillArgs {
    /// Total consumption for the period (kWh)
    #[arg(long, help = "Consumption total in kWh (must be >= 0)")]
    pub kwh: f64,

    /// Billing period length in days
    #[arg(long, help = "Billing period in days (defaults to tariff.billing_period_days)")]
    pub days: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Reading to check (kWh)
    #[arg(long)]
    pub current: f64,

    /// Comma-separated readings of the trailing window (kWh)
    #[arg(long, value_delimiter = ',')]
    pub window: Vec<f64>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Comma-separated consumption values, oldest first (kWh)
    #[arg(long, value_delimiter = ',', required = true)]
    pub values: Vec<f64>,

    /// Comma-separated models or "all"
    #[arg(
        long,
        help = "Models to run (lstm, regression, ann, all); defaults to prediction.models"
    )]
    pub models: Option<String>,
}

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Days of sample history to generate
    #[arg(long, default_value_t = 30)]
    pub days: u32,

    /// Seed for reproducible sample data
    #[arg(long)]
    pub seed: Option<u64>,
}
