use crate::domain::market::price_series::PriceSeries;

/// Next-day direction labels: `Some(1)` when the next close is strictly higher,
/// `Some(0)` otherwise, and `None` for the final bar whose next close is unknown.
pub fn build_labels(series: &PriceSeries) -> Vec<Option<u8>> {
    labels_from_closes(&series.closes())
}

pub fn labels_from_closes(closes: &[f64]) -> Vec<Option<u8>> {
    let mut labels: Vec<Option<u8>> = closes
        .windows(2)
        .map(|pair| Some(u8::from(pair[1] > pair[0])))
        .collect();
    if !closes.is_empty() {
        labels.push(None);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_compare_next_close() {
        let labels = labels_from_closes(&[10.0, 11.0, 11.0, 10.5, 12.0]);
        assert_eq!(labels, vec![Some(1), Some(0), Some(0), Some(1), None]);
    }

    #[test]
    fn test_final_label_is_undefined_not_zero() {
        assert_eq!(labels_from_closes(&[10.0]), vec![None]);
        assert!(labels_from_closes(&[]).is_empty());
    }
}
