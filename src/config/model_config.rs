//! Model and feature configuration parsed from environment variables.

use super::{Lookup, parse_or};
use crate::application::ml::random_forest::RandomForestParams;
use crate::domain::ml::feature_registry::{FeatureSet, parse_horizons};
use crate::domain::ml::prediction::DecisionThreshold;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEnvConfig {
    pub threshold: f64,
    pub feature_set: FeatureSet,
    pub forest: RandomForestParams,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            threshold: DecisionThreshold::DEFAULT,
            feature_set: FeatureSet::default(),
            forest: RandomForestParams::default(),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: &Lookup) -> Result<Self> {
        let defaults = RandomForestParams::default();

        let feature_set = match lookup("FEATURE_SET") {
            Some(s) => s.parse::<FeatureSet>()?,
            None => FeatureSet::default(),
        };
        let feature_set = match (feature_set, lookup("FEATURE_HORIZONS")) {
            (FeatureSet::Engineered { .. }, Some(h)) => FeatureSet::Engineered {
                horizons: parse_horizons(&h).context("Failed to parse FEATURE_HORIZONS")?,
            },
            (set, _) => set,
        };

        let max_depth = match lookup("RF_MAX_DEPTH") {
            Some(s) => Some(
                s.trim()
                    .parse::<u16>()
                    .context("Failed to parse RF_MAX_DEPTH")?,
            ),
            None => defaults.max_depth,
        };

        Ok(Self {
            threshold: parse_or(lookup, "DECISION_THRESHOLD", DecisionThreshold::DEFAULT)?,
            feature_set,
            forest: RandomForestParams {
                n_trees: parse_or(lookup, "RF_N_TREES", defaults.n_trees)?,
                min_samples_split: parse_or(
                    lookup,
                    "RF_MIN_SAMPLES_SPLIT",
                    defaults.min_samples_split,
                )?,
                max_depth,
                max_features: defaults.max_features,
                seed: parse_or(lookup, "RF_SEED", defaults.seed)?,
            },
        })
    }
}
