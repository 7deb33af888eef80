//! Price history providers

pub mod csv;
pub mod provider;
pub mod yahoo;

pub use self::csv::CsvProvider;
pub use provider::{DataError, DataSource, HistoryProvider, StaticProvider};
pub use yahoo::YahooProvider;
