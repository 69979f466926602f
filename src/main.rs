//! nextclose - walk-forward backtest of a next-day-up classifier
//!
//! Loads daily OHLCV history from CSV, backtests a random forest with an
//! expanding training window, prints precision against the always-up
//! baseline and exports the predictions.
//!
//! # Usage
//! ```sh
//! cargo run -- --input data/osebx.csv --since 2019-01-01 --future-days 5
//! ```
//!
//! # Environment Variables
//! See `config` for the full list (`BACKTEST_START`, `BACKTEST_STEP`,
//! `DECISION_THRESHOLD`, `FEATURE_SET`, `FEATURE_HORIZONS`, `RF_N_TREES`, ...).

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use nextclose::application::backtesting::walk_forward::ExecutionMode;
use nextclose::application::evaluation::reporting::{RunReport, RunReporter};
use nextclose::application::pipeline::Pipeline;
use nextclose::config::Config;
use nextclose::domain::ml::feature_registry::{FeatureSet, parse_horizons};
use nextclose::infrastructure::csv_export::export_predictions;
use nextclose::infrastructure::csv_source::load_price_series;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OHLCV history CSV (Date,Open,High,Low,Close,Volume)
    #[arg(long, default_value = "data/prices.csv")]
    input: PathBuf,

    /// Directory for prediction CSVs and the JSON report
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// TOML run configuration (used instead of environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// First predicted row of the feature frame
    #[arg(long)]
    start: Option<usize>,

    /// Rows per test window
    #[arg(long)]
    step: Option<usize>,

    /// Probability at or above which a day is predicted up
    #[arg(long)]
    threshold: Option<f64>,

    /// Predictor columns: "engineered" or "raw"
    #[arg(long)]
    feature_set: Option<String>,

    /// Rolling horizons for engineered features (e.g. "2,5,60,250")
    #[arg(long)]
    horizons: Option<String>,

    /// Number of trees in the random forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Minimum samples required to split an internal node
    #[arg(long)]
    min_split: Option<usize>,

    /// Maximum depth of trees
    #[arg(long)]
    max_depth: Option<u16>,

    /// Random seed for bootstrap sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Business days to project past the last bar
    #[arg(long)]
    future_days: Option<usize>,

    /// Ignore bars before this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Fit walk-forward windows in parallel
    #[arg(long)]
    parallel: bool,

    /// Skip writing the JSON report
    #[arg(long)]
    no_report: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(start) = self.start {
            config.backtest.start = start;
        }
        if let Some(step) = self.step {
            config.backtest.step = step;
        }
        if let Some(days) = self.future_days {
            config.backtest.future_days = days;
        }
        if let Some(since) = self.since {
            config.backtest.since = Some(since);
        }
        if self.parallel {
            config.backtest.execution_mode = ExecutionMode::Parallel;
        }
        if let Some(threshold) = self.threshold {
            config.model.threshold = threshold;
        }
        if let Some(set) = &self.feature_set {
            config.model.feature_set = set.parse()?;
        }
        if let Some(horizons) = &self.horizons {
            let horizons = parse_horizons(horizons).context("Invalid --horizons")?;
            match config.model.feature_set {
                FeatureSet::Engineered { .. } => {
                    config.model.feature_set = FeatureSet::Engineered { horizons }
                }
                FeatureSet::Raw => anyhow::bail!("--horizons only applies to engineered features"),
            }
        }
        if let Some(n) = self.n_trees {
            config.model.forest.n_trees = n;
        }
        if let Some(n) = self.min_split {
            config.model.forest.min_samples_split = n;
        }
        if let Some(depth) = self.max_depth {
            config.model.forest.max_depth = Some(depth);
        }
        if let Some(seed) = self.seed {
            config.model.forest.seed = seed;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    args.apply(&mut config)?;
    config.validate()?;
    info!("Configuration loaded: {:?}", config);

    let mut series = load_price_series(&args.input)?;
    if let Some(since) = config.backtest.since {
        series = series
            .since(since)
            .with_context(|| format!("No bars on or after {}", since))?;
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    info!(
        "Running {} (threshold {}) on {} bars with predictors {:?}",
        pipeline.predictor().model_name(),
        pipeline.predictor().threshold().value(),
        series.len(),
        pipeline.feature_names()
    );
    let output = pipeline.run(&series)?;

    RunReporter::print_summary(&output.evaluation);

    let predictions_path = args.output_dir.join("predictions.csv");
    export_predictions(&predictions_path, &output.backtest)?;
    info!("Predictions saved to {}", predictions_path.display());

    if !output.future.is_empty() {
        for record in &output.future {
            println!("{}  predicted {}", record.date, record.predicted);
        }
        let combined_path = args.output_dir.join("predictions_with_future.csv");
        export_predictions(&combined_path, &output.combined())?;
        info!("Predictions with projections saved to {}", combined_path.display());
    }

    if !args.no_report {
        let reporter = RunReporter::new(&args.output_dir)?;
        let report = RunReport {
            timestamp: Utc::now(),
            model: pipeline.predictor().model_name().to_string(),
            configuration: serde_json::to_value(&config)?,
            first_date: output.backtest.first().map(|r| r.date.to_string()),
            last_date: output.backtest.last().map(|r| r.date.to_string()),
            backtest_rows: output.backtest.len(),
            future_rows: output.future.len(),
            evaluation: output.evaluation.clone(),
        };
        let path = reporter.write_report(&report)?;
        info!("Report saved to {}", path.display());
    }

    Ok(())
}
