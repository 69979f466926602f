use crate::application::evaluation::evaluator::Evaluation;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub configuration: serde_json::Value,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub backtest_rows: usize,
    pub future_rows: usize,
    pub evaluation: Evaluation,
}

pub struct RunReporter {
    output_dir: PathBuf,
}

impl RunReporter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
        }
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Writes `report` as pretty JSON and returns its path.
    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        let filename = format!(
            "walk_forward_report_{}.json",
            report.timestamp.format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);

        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write report file")?;
        Ok(path)
    }

    pub fn print_summary(evaluation: &Evaluation) {
        println!("\n{}", "=".repeat(60));
        println!("WALK-FORWARD SUMMARY ({} scored days)", evaluation.scored);
        println!("{}", "=".repeat(60));

        if evaluation.scored == 0 {
            println!("No scored predictions.");
            println!("{}", "=".repeat(60));
            return;
        }

        println!("Predictions:");
        println!("  1 (up)   {:>7}", evaluation.predicted.up);
        println!("  0 (down) {:>7}", evaluation.predicted.down);
        println!(
            "Precision:           {:.4}  (baseline {:.4}, edge {:+.4})",
            evaluation.precision, evaluation.baseline_precision, evaluation.edge_over_baseline
        );
        println!("Recall:              {:.4}", evaluation.recall);
        println!("Accuracy:            {:.4}", evaluation.accuracy);
        println!("Actual distribution:");
        println!("  1 (up)   {:.4}", evaluation.actual.up_ratio());
        println!("  0 (down) {:.4}", evaluation.actual.down_ratio());

        let c = &evaluation.confusion;
        println!(
            "Confusion: TP={} FP={} TN={} FN={}",
            c.true_positives, c.false_positives, c.true_negatives, c.false_negatives
        );
        println!("{}", "=".repeat(60));

        if evaluation.edge_over_baseline <= 0.0 {
            println!("Model does not beat the always-up baseline.");
        }
    }
}
