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

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use cli::{BillArgs, CheckArgs, Cli, Commands, DemoArgs, PredictArgs, TableFormatter};
use rand::SeedableRng;
use rand::rngs::StdRng;
use smartwatt_core::sample::generate_sample_readings;
use smartwatt_core::{
    AnalyticsEngine, AnomalyDetector, EngineConfig, EngineError, EstimatorRegistry, MemoryStore,
    PredictionAggregator, ReadingStore, TariffCalculator,
};
use smartwatt_types::{ModelKind, Reading};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_USER: u64 = 1;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smartwatt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Bill(args) => bill_command(&config, &args),
        Commands::Check(args) => check_command(&config, &args),
        Commands::Predict(args) => predict_command(&config, &args),
        Commands::Demo(args) => demo_command(config, &args),
        Commands::Config => config_command(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => EngineConfig::load().context("Failed to load configuration"),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn bill_command(config: &EngineConfig, args: &BillArgs) -> Result<()> {
    let calculator = TariffCalculator::from_config(&config.tariff)?;
    let bill = calculator.bill(args.kwh)?;
    let breakdown = calculator.breakdown(args.kwh)?;
    let period_days = args.days.unwrap_or(config.tariff.billing_period_days);

    print!("{}", TableFormatter::format_bill(&breakdown, &bill, period_days));
    Ok(())
}

fn check_command(config: &EngineConfig, args: &CheckArgs) -> Result<()> {
    let detector = AnomalyDetector::new(&config.anomaly)?;

    let now = Utc::now();
    let window: Vec<Reading> = args
        .window
        .iter()
        .map(|value| Reading::new(now, *value))
        .collect();

    let verdict = detector.check(args.current, &window)?;
    print!("{}", TableFormatter::format_verdict(&verdict, window.len()));
    Ok(())
}

fn parse_models(raw: Option<&str>, config: &EngineConfig) -> Result<Vec<ModelKind>> {
    match raw {
        None => Ok(config.prediction.models.clone()),
        Some(raw) if raw.trim().eq_ignore_ascii_case("all") => Ok(ModelKind::all().to_vec()),
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ModelKind>)
            .collect(),
    }
}

fn validate_values(values: &[f64]) -> Result<()> {
    for value in values {
        anyhow::ensure!(
            value.is_finite() && *value >= 0.0,
            "consumption values must be finite and non-negative, got {value}"
        );
    }
    Ok(())
}

fn predict_command(config: &EngineConfig, args: &PredictArgs) -> Result<()> {
    validate_values(&args.values)?;
    let models = parse_models(args.models.as_deref(), config)?;

    let registry = EstimatorRegistry::from_config(&config.prediction)?;
    let aggregator = PredictionAggregator::new(registry, config.prediction.estimator_timeout());

    let result = runtime()?.block_on(aggregator.predict(&args.values, &models));
    print!("{}", TableFormatter::format_prediction(&result));
    Ok(())
}

fn demo_command(config: EngineConfig, args: &DemoArgs) -> Result<()> {
    let mut rng = args
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let now = Utc::now();
    let today = now.date_naive();

    let history = generate_sample_readings(&mut rng, today, args.days);
    info!(readings = history.len(), days = args.days, "Generated sample history");

    // Well above any reading in the history, so the demo shows an alert
    let spike = history.iter().map(|r| r.value_kwh).fold(0.0, f64::max) * 2.0;

    let registry = EstimatorRegistry::from_config(&config.prediction)?;
    let store = Arc::new(MemoryStore::new());
    let engine = AnalyticsEngine::new(
        config,
        registry,
        store.clone(),
        store.clone(),
        store.clone(),
    )?;

    runtime()?.block_on(async {
        for reading in history {
            store
                .append(DEMO_USER, reading)
                .await
                .map_err(|e| EngineError::store(&e))?;
        }

        println!("== Ingest ==");
        let verdict = engine
            .ingest(DEMO_USER, Reading::new(now, spike), now)
            .await?;
        let detector = engine.detector();
        let stored = store
            .read_window(DEMO_USER, detector.window_start_date(now), today)
            .await
            .map_err(|e| EngineError::store(&e))?;
        let window_len = detector.select_window(&stored, now).len();
        print!("{}", TableFormatter::format_verdict(&verdict, window_len));
        println!("Alerts recorded: {}\n", store.alerts(DEMO_USER).len());

        let days = detector.window_days();
        println!("== Last {days} days ==");
        let usage = engine.daily_usage(DEMO_USER, today, days).await?;
        print!("{}", TableFormatter::format_daily_usage(&usage));

        println!("\n== Bill ==");
        let estimate = engine.estimate_bill(DEMO_USER, today, None).await?;
        let breakdown = engine.tariff().breakdown(estimate.bill.period_consumption)?;
        print!(
            "{}",
            TableFormatter::format_bill(&breakdown, &estimate.bill, estimate.period_days)
        );

        println!("\n== Prediction for tomorrow ==");
        match engine.generate_predictions(DEMO_USER, today).await {
            Ok(result) => print!("{}", TableFormatter::format_prediction(&result)),
            Err(EngineError::InsufficientData {
                required,
                available,
            }) => println!(
                "Insufficient data: predictions need {required} readings, only {available} available"
            ),
            Err(e) => return Err(e.into()),
        }

        Ok::<_, anyhow::Error>(())
    })
}

fn config_command(config: &EngineConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
