// Trading calendar helpers
pub mod calendar;
pub mod price_series;
