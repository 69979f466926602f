pub mod csv_export;
pub mod csv_source;
