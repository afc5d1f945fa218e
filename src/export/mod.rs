//! Offline artifacts written from a collection result.

mod csv;

pub use self::csv::{export_csv, write_csv, CsvRow};
