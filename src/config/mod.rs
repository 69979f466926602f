//! Configuration module for nextclose.
//!
//! Configuration is loaded from environment variables (optionally via a `.env`
//! file) or from a TOML file with the same structure, organized by concern:
//! Backtest scheduling and Model.

mod backtest_config;
mod model_config;

pub use backtest_config::BacktestEnvConfig;
pub use model_config::ModelEnvConfig;

use crate::domain::ml::feature_registry::FeatureSet;
use crate::domain::ml::prediction::DecisionThreshold;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Variable lookup used by the `from_lookup` constructors.
pub type Lookup = dyn Fn(&str) -> Option<String>;

/// Main run configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backtest: BacktestEnvConfig,
    pub model: ModelEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &Lookup) -> Result<Self> {
        let backtest =
            BacktestEnvConfig::from_lookup(lookup).context("Failed to load backtest config")?;
        let model = ModelEnvConfig::from_lookup(lookup).context("Failed to load model config")?;
        Ok(Self { backtest, model })
    }

    /// Load configuration from a TOML file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))
    }

    pub fn threshold(&self) -> Result<DecisionThreshold> {
        DecisionThreshold::new(self.model.threshold).with_context(|| {
            format!(
                "Decision threshold must be within [0, 1], got {}",
                self.model.threshold
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.threshold()?;

        if self.backtest.step == 0 {
            anyhow::bail!("Backtest step must be positive");
        }
        if self.model.forest.n_trees == 0 {
            anyhow::bail!("Random forest needs at least one tree");
        }

        if let FeatureSet::Engineered { horizons } = &self.model.feature_set {
            if horizons.is_empty() {
                anyhow::bail!("Engineered feature set needs at least one horizon");
            }
            if horizons.contains(&0) {
                anyhow::bail!("Feature horizons must be positive");
            }
        }
        Ok(())
    }
}

fn parse_or<T>(lookup: &Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::backtesting::walk_forward::ExecutionMode;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backtest.start, 250);
        assert_eq!(config.backtest.step, 25);
        assert!((config.model.threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.model.forest.n_trees, 100);
        assert_eq!(config.model.forest.min_samples_split, 100);
        assert_eq!(config.model.forest.seed, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_start_counts_rows_after_warm_up() {
        // start indexes the frame left after the 250-bar warm-up is dropped
        let config = Config::default();
        assert_eq!(config.backtest.start, 250);
        assert_eq!(config.model.feature_set.max_horizon(), 250);
        config.validate().unwrap();

        let mut config = Config::default();
        config.backtest.start = 10;
        config.validate().unwrap();
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = Config::from_lookup(&lookup_from(&[
            ("BACKTEST_START", "300"),
            ("BACKTEST_STEP", "10"),
            ("BACKTEST_PARALLEL", "true"),
            ("FUTURE_DAYS", "5"),
            ("DATA_SINCE", "2019-01-01"),
            ("DECISION_THRESHOLD", "0.5"),
            ("FEATURE_HORIZONS", "2,5,60"),
            ("RF_N_TREES", "50"),
            ("RF_MAX_DEPTH", "8"),
        ]))
        .unwrap();

        assert_eq!(config.backtest.start, 300);
        assert_eq!(config.backtest.step, 10);
        assert_eq!(config.backtest.execution_mode, ExecutionMode::Parallel);
        assert_eq!(config.backtest.future_days, 5);
        assert_eq!(config.backtest.since.unwrap().to_string(), "2019-01-01");
        assert_eq!(
            config.model.feature_set,
            FeatureSet::Engineered {
                horizons: vec![2, 5, 60]
            }
        );
        assert_eq!(config.model.forest.n_trees, 50);
        assert_eq!(config.model.forest.max_depth, Some(8));
        config.validate().unwrap();
    }

    #[test]
    fn test_raw_feature_set_ignores_horizons() {
        let config = Config::from_lookup(&lookup_from(&[
            ("FEATURE_SET", "raw"),
            ("FEATURE_HORIZONS", "2,5"),
        ]))
        .unwrap();
        assert_eq!(config.model.feature_set, FeatureSet::Raw);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(&lookup_from(&[("BACKTEST_STEP", "abc")])).is_err());
        assert!(Config::from_lookup(&lookup_from(&[("DATA_SINCE", "01/01/2019")])).is_err());

        let mut config = Config::default();
        config.model.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.feature_set = FeatureSet::Engineered { horizons: vec![] };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.feature_set = FeatureSet::Engineered {
            horizons: vec![2, 0],
        };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backtest.step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
[backtest]
start = 100
step = 20
execution_mode = "parallel"

[model]
threshold = 0.55

[model.feature_set]
kind = "engineered"
horizons = [2, 5, 60]

[model.forest]
n_trees = 25
min_samples_split = 50
seed = 7
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.backtest.start, 100);
        assert_eq!(config.backtest.execution_mode, ExecutionMode::Parallel);
        assert_eq!(config.backtest.future_days, 0);
        assert_eq!(config.model.forest.n_trees, 25);
        assert_eq!(config.model.forest.max_depth, None);
        config.validate().unwrap();
    }
}
