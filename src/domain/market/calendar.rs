use chrono::{Datelike, Days, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next `count` Monday-to-Friday dates strictly after `after`.
///
/// Exchange holidays are not modelled.
pub fn next_business_days(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut cursor = after;
    while dates.len() < count {
        match cursor.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
        if is_business_day(cursor) {
            dates.push(cursor);
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_weekend() {
        // 2024-03-08 is a Friday
        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let dates = next_business_days(friday, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(),
            ]
        );
    }

    #[test]
    fn test_zero_count() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert!(next_business_days(day, 0).is_empty());
    }
}
