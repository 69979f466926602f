//! Backtest scheduling parsed from environment variables.

use super::{Lookup, parse_or};
use crate::application::backtesting::walk_forward::{DEFAULT_START, DEFAULT_STEP, ExecutionMode};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestEnvConfig {
    /// First row (after feature warm-up) that is predicted
    pub start: usize,
    pub step: usize,
    pub execution_mode: ExecutionMode,
    /// Business days to project past the last bar
    pub future_days: usize,
    /// Drop bars before this date
    pub since: Option<NaiveDate>,
}

impl Default for BacktestEnvConfig {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            step: DEFAULT_STEP,
            execution_mode: ExecutionMode::Sequential,
            future_days: 0,
            since: None,
        }
    }
}

impl BacktestEnvConfig {
    pub fn from_lookup(lookup: &Lookup) -> Result<Self> {
        let defaults = Self::default();

        let execution_mode = if parse_or(lookup, "BACKTEST_PARALLEL", false)? {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        };

        let since = match lookup("DATA_SINCE") {
            Some(s) => Some(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .context("Failed to parse DATA_SINCE - expected YYYY-MM-DD")?,
            ),
            None => None,
        };

        Ok(Self {
            start: parse_or(lookup, "BACKTEST_START", defaults.start)?,
            step: parse_or(lookup, "BACKTEST_STEP", defaults.step)?,
            execution_mode,
            future_days: parse_or(lookup, "FUTURE_DAYS", defaults.future_days)?,
            since,
        })
    }
}
