//! Expanding-window walk-forward backtesting.
//!
//! The frame is cut into consecutive test windows of `step` rows starting at
//! row `start`. Each window is predicted by a model trained on every row before
//! it, so no model is ever scored on rows it was trained on:
//!
//! ```text
//! rows:   0 ........ start ... start+step ... start+2*step ... len
//! win 0:  [ train   )[ test  )
//! win 1:  [ train             )[ test       )
//! win 2:  [ train                           )[ test (<= step) )
//! ```

use crate::application::ml::predictor::Predictor;
use crate::domain::errors::BacktestError;
use crate::domain::ml::dataset::FeatureFrame;
use crate::domain::ml::prediction::PredictionRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_START: usize = 250;
pub const DEFAULT_STEP: usize = 25;

/// How windows are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One window after another, refitting the predictor's own model
    #[default]
    Sequential,
    /// Windows fitted concurrently on fresh models, reassembled in window order
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            _ => anyhow::bail!(
                "Invalid execution mode: {}. Must be 'sequential' or 'parallel'",
                s
            ),
        }
    }
}

/// One train/test split, as row index ranges into the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkForwardWindow {
    pub index: usize,
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Plans the windows for a frame of `len` rows.
///
/// Returns no windows when `start >= len`. The last test window is shorter
/// than `step` when `len - start` is not a multiple of `step`.
pub fn walk_forward_windows(
    len: usize,
    start: usize,
    step: usize,
) -> Result<Vec<WalkForwardWindow>, BacktestError> {
    if step == 0 {
        return Err(BacktestError::InvalidStep);
    }
    Ok((start..len)
        .step_by(step)
        .enumerate()
        .map(|(index, i)| WalkForwardWindow {
            index,
            train: 0..i,
            test: i..(i + step).min(len),
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct WalkForwardBacktester {
    start: usize,
    step: usize,
    mode: ExecutionMode,
}

impl Default for WalkForwardBacktester {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            step: DEFAULT_STEP,
            mode: ExecutionMode::Sequential,
        }
    }
}

impl WalkForwardBacktester {
    pub fn new(start: usize, step: usize) -> Result<Self, BacktestError> {
        if step == 0 {
            return Err(BacktestError::InvalidStep);
        }
        Ok(Self {
            start,
            step,
            mode: ExecutionMode::Sequential,
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Runs every window and concatenates the predictions in date order.
    ///
    /// `frame` must hold only labelled rows with defined features, as produced
    /// by [`FeatureFrame::labelled`]. A failing window aborts the run.
    pub fn backtest(
        &self,
        frame: &FeatureFrame,
        predictor: &mut Predictor,
    ) -> Result<Vec<PredictionRecord>, BacktestError> {
        let windows = walk_forward_windows(frame.len(), self.start, self.step)?;
        if windows.is_empty() {
            warn!(
                "No walk-forward windows: start {} >= {} rows",
                self.start,
                frame.len()
            );
            return Ok(Vec::new());
        }

        info!(
            "Walk-forward backtest: {} windows over {} rows (start={}, step={}, mode={:?})",
            windows.len(),
            frame.len(),
            self.start,
            self.step,
            self.mode
        );

        let rows = frame.rows();
        let batches: Vec<Vec<PredictionRecord>> = match self.mode {
            ExecutionMode::Sequential => {
                let mut batches = Vec::with_capacity(windows.len());
                for window in &windows {
                    batches.push(run_window(predictor, frame, window)?);
                }
                batches
            }
            ExecutionMode::Parallel => {
                let template: &Predictor = predictor;
                windows
                    .par_iter()
                    .map(|w| run_window(&mut template.fresh(), frame, w))
                    .collect::<Result<_, _>>()?
            }
        };

        let records: Vec<PredictionRecord> = batches.into_iter().flatten().collect();
        debug_assert_eq!(records.len(), rows.len().saturating_sub(self.start));
        info!("Walk-forward backtest produced {} predictions", records.len());
        Ok(records)
    }
}

fn run_window(
    predictor: &mut Predictor,
    frame: &FeatureFrame,
    window: &WalkForwardWindow,
) -> Result<Vec<PredictionRecord>, BacktestError> {
    let rows = frame.rows();
    let train = &rows[window.train.clone()];
    let test = &rows[window.test.clone()];

    debug!(
        "Window {}: train rows {:?}, test rows {:?}",
        window.index, window.train, window.test
    );

    predictor
        .predict(train, test)
        .map_err(|source| BacktestError::WindowFailed {
            index: window.index,
            train_end: window.train.end,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::predictor::tests::{EchoClassifier, rows};
    use crate::domain::ml::prediction::DecisionThreshold;

    fn alternating_frame(len: usize) -> FeatureFrame {
        let values: Vec<(f64, Option<u8>)> = (0..len)
            .map(|i| {
                let label = (i % 2) as u8;
                (if label == 1 { 0.8 } else { 0.2 }, Some(label))
            })
            .collect();
        FeatureFrame::new(vec!["p".to_string()], rows(&values))
    }

    #[test]
    fn test_windows_cover_tail_without_overlap() {
        let windows = walk_forward_windows(110, 50, 25).unwrap();
        let tests: Vec<Range<usize>> = windows.iter().map(|w| w.test.clone()).collect();
        assert_eq!(tests, vec![50..75, 75..100, 100..110]);
        for w in &windows {
            assert_eq!(w.train.start, 0);
            assert_eq!(w.train.end, w.test.start);
        }
    }

    #[test]
    fn test_no_windows_when_start_past_end() {
        assert!(walk_forward_windows(10, 10, 5).unwrap().is_empty());
        assert_eq!(
            walk_forward_windows(10, 2, 0),
            Err(BacktestError::InvalidStep)
        );
    }

    #[test]
    fn test_backtest_concatenates_in_date_order() {
        let frame = alternating_frame(60);
        let mut predictor = Predictor::new(EchoClassifier::boxed(), DecisionThreshold::default());
        let backtester = WalkForwardBacktester::new(20, 7).unwrap();

        let records = backtester.backtest(&frame, &mut predictor).unwrap();
        assert_eq!(records.len(), 40);
        assert!(records.windows(2).all(|p| p[0].date < p[1].date));
        assert_eq!(records[0].date, frame.rows()[20].date);
        assert!(records.iter().all(|r| Some(r.predicted) == r.actual));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frame = alternating_frame(80);
        let mut predictor = Predictor::new(EchoClassifier::boxed(), DecisionThreshold::default());

        let sequential = WalkForwardBacktester::new(30, 9)
            .unwrap()
            .backtest(&frame, &mut predictor)
            .unwrap();
        let parallel = WalkForwardBacktester::new(30, 9)
            .unwrap()
            .with_mode(ExecutionMode::Parallel)
            .backtest(&frame, &mut predictor)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_failing_window_reports_index() {
        // First window trains on a single class
        let mut values: Vec<(f64, Option<u8>)> = vec![(0.9, Some(1)); 10];
        values.extend(vec![(0.1, Some(0)); 10]);
        let frame = FeatureFrame::new(vec!["p".to_string()], rows(&values));
        let mut predictor = Predictor::new(EchoClassifier::boxed(), DecisionThreshold::default());

        let result = WalkForwardBacktester::new(5, 5)
            .unwrap()
            .backtest(&frame, &mut predictor);
        assert!(matches!(
            result,
            Err(BacktestError::WindowFailed { index: 0, train_end: 5, .. })
        ));
    }
}
