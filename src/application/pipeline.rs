use crate::application::backtesting::future_projector::FutureProjector;
use crate::application::backtesting::walk_forward::WalkForwardBacktester;
use crate::application::evaluation::evaluator::{Evaluation, evaluate};
use crate::application::features::feature_builder::FeatureBuilder;
use crate::application::ml::predictor::Predictor;
use crate::application::ml::random_forest::RandomForestClassifier;
use crate::config::Config;
use crate::domain::errors::BacktestError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::prediction::PredictionRecord;
use anyhow::Context;
use tracing::info;

/// Everything a run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub backtest: Vec<PredictionRecord>,
    pub future: Vec<PredictionRecord>,
    pub evaluation: Evaluation,
}

impl PipelineOutput {
    /// Backtest records followed by the future projections.
    pub fn combined(&self) -> Vec<PredictionRecord> {
        self.backtest
            .iter()
            .chain(self.future.iter())
            .copied()
            .collect()
    }
}

/// Features, model and schedule for one walk-forward run.
pub struct Pipeline {
    builder: FeatureBuilder,
    predictor: Predictor,
    backtester: WalkForwardBacktester,
    projector: FutureProjector,
}

impl Pipeline {
    pub fn new(
        builder: FeatureBuilder,
        predictor: Predictor,
        backtester: WalkForwardBacktester,
        projector: FutureProjector,
    ) -> Self {
        Self {
            builder,
            predictor,
            backtester,
            projector,
        }
    }

    /// Builds the random-forest pipeline described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let model = RandomForestClassifier::new(config.model.forest.clone());
        let predictor = Predictor::new(Box::new(model), config.threshold()?);
        let backtester = WalkForwardBacktester::new(config.backtest.start, config.backtest.step)
            .context("Invalid backtest schedule")?
            .with_mode(config.backtest.execution_mode);

        Ok(Self::new(
            FeatureBuilder::new(config.model.feature_set.clone()),
            predictor,
            backtester,
            FutureProjector::new(config.backtest.future_days),
        ))
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.builder.feature_set().names()
    }

    pub fn run(&mut self, series: &PriceSeries) -> Result<PipelineOutput, BacktestError> {
        let frame = self.builder.build(series).labelled();
        info!(
            "Feature frame: {} labelled rows of {} bars (warm-up {}), predictors {:?}",
            frame.len(),
            series.len(),
            self.builder.feature_set().max_horizon(),
            frame.columns()
        );

        let backtest = self.backtester.backtest(&frame, &mut self.predictor)?;
        let evaluation = evaluate(&backtest);
        info!(
            "Precision {:.4} over {} scored rows (baseline {:.4})",
            evaluation.precision, evaluation.scored, evaluation.baseline_precision
        );

        let future = self
            .projector
            .project(series, &self.builder, &mut self.predictor)?;

        Ok(PipelineOutput {
            backtest,
            future,
            evaluation,
        })
    }
}
