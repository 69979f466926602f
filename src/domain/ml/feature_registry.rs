use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw OHLCV columns, in the order the raw feature set presents them to the model.
pub const RAW_FEATURE_NAMES: &[&str] = &["Close", "Volume", "Open", "High", "Low"];

/// Default rolling horizons (trading days) for the engineered feature set.
pub const DEFAULT_HORIZONS: &[usize] = &[2, 5, 60, 250];

/// Column name of the target label in exported tables.
pub const LABEL_COLUMN: &str = "morgendag";

/// Column name of the predicted label in exported tables.
pub const PREDICTION_COLUMN: &str = "Predictions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawField {
    Close,
    Volume,
    Open,
    High,
    Low,
}

impl RawField {
    pub const ALL: [RawField; 5] = [
        RawField::Close,
        RawField::Volume,
        RawField::Open,
        RawField::High,
        RawField::Low,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            RawField::Close => "Close",
            RawField::Volume => "Volume",
            RawField::Open => "Open",
            RawField::High => "High",
            RawField::Low => "Low",
        }
    }
}

/// What a feature column measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// close / mean(close over the trailing horizon, current bar included)
    CloseRatio,
    /// sum of labels over the horizon ending the day before
    Trend,
    Raw(RawField),
}

/// A feature column identified by (kind, horizon).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey {
    pub kind: FeatureKind,
    pub horizon: usize,
}

impl FeatureKey {
    pub fn close_ratio(horizon: usize) -> Self {
        Self {
            kind: FeatureKind::CloseRatio,
            horizon,
        }
    }

    pub fn trend(horizon: usize) -> Self {
        Self {
            kind: FeatureKind::Trend,
            horizon,
        }
    }

    pub fn raw(field: RawField) -> Self {
        Self {
            kind: FeatureKind::Raw(field),
            horizon: 1,
        }
    }

    pub fn name(&self) -> String {
        match self.kind {
            FeatureKind::CloseRatio => format!("Close_Ratio_{}", self.horizon),
            FeatureKind::Trend => format!("Trend_{}", self.horizon),
            FeatureKind::Raw(field) => field.column().to_string(),
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which predictor columns the model is trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureSet {
    /// Raw OHLCV values as predictors
    Raw,
    /// Rolling close ratios and label trends over each horizon
    Engineered { horizons: Vec<usize> },
}

impl Default for FeatureSet {
    fn default() -> Self {
        FeatureSet::Engineered {
            horizons: DEFAULT_HORIZONS.to_vec(),
        }
    }
}

impl FeatureSet {
    /// Ordered feature keys. For engineered sets all ratio columns come first,
    /// then all trend columns, each in horizon order.
    pub fn keys(&self) -> Vec<FeatureKey> {
        match self {
            FeatureSet::Raw => RawField::ALL.iter().map(|f| FeatureKey::raw(*f)).collect(),
            FeatureSet::Engineered { horizons } => horizons
                .iter()
                .map(|h| FeatureKey::close_ratio(*h))
                .chain(horizons.iter().map(|h| FeatureKey::trend(*h)))
                .collect(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.keys().iter().map(FeatureKey::name).collect()
    }

    /// Largest look-back any column needs; 0 for the raw set.
    pub fn max_horizon(&self) -> usize {
        match self {
            FeatureSet::Raw => 0,
            FeatureSet::Engineered { horizons } => horizons.iter().copied().max().unwrap_or(0),
        }
    }
}

impl FromStr for FeatureSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(FeatureSet::Raw),
            "engineered" => Ok(FeatureSet::default()),
            _ => anyhow::bail!("Invalid FEATURE_SET: {}. Must be 'raw' or 'engineered'", s),
        }
    }
}

/// Parses "2,5,60,250" into horizons.
pub fn parse_horizons(s: &str) -> anyhow::Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in s.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
        let horizon: usize = part.parse().map_err(|_| {
            anyhow::anyhow!("horizons must be comma-separated integers, got '{}'", part)
        })?;
        if horizon == 0 {
            anyhow::bail!("Horizon must be positive");
        }
        out.push(horizon);
    }
    if out.is_empty() {
        anyhow::bail!("At least one horizon is required");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engineered_column_order() {
        let set = FeatureSet::Engineered {
            horizons: vec![2, 5],
        };
        assert_eq!(
            set.names(),
            vec!["Close_Ratio_2", "Close_Ratio_5", "Trend_2", "Trend_5"]
        );
        assert_eq!(set.max_horizon(), 5);
    }

    #[test]
    fn test_raw_column_order() {
        assert_eq!(FeatureSet::Raw.names(), RAW_FEATURE_NAMES);
        assert_eq!(FeatureSet::Raw.max_horizon(), 0);
    }

    #[test]
    fn test_parse_horizons() {
        assert_eq!(parse_horizons("2, 5,60").unwrap(), vec![2, 5, 60]);
        assert!(parse_horizons("").is_err());
        assert!(parse_horizons("2,0").is_err());
        assert!(parse_horizons("2,x").is_err());
    }

    #[test]
    fn test_feature_set_from_str() {
        assert_eq!(FeatureSet::from_str("RAW").unwrap(), FeatureSet::Raw);
        assert_eq!(
            FeatureSet::from_str("engineered").unwrap(),
            FeatureSet::default()
        );
        assert!(FeatureSet::from_str("lstm").is_err());
    }
}
