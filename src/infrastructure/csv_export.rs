use crate::domain::ml::feature_registry::{LABEL_COLUMN, PREDICTION_COLUMN};
use crate::domain::ml::prediction::PredictionRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes `date,morgendag,Predictions` rows. Unknown actual labels are left blank.
pub fn write_predictions<W: Write>(writer: W, records: &[PredictionRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", LABEL_COLUMN, PREDICTION_COLUMN])?;
    for record in records {
        wtr.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.actual.map(|a| a.to_string()).unwrap_or_default(),
            record.predicted.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_predictions(path: &Path, records: &[PredictionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_predictions(file, records)
        .with_context(|| format!("Failed to write predictions to {}", path.display()))
}
