//! CSV import provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `date,open,high,low,close,volume`
//! header. Dates are `YYYY-MM-DD`; an empty price cell is a missing value.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::provider::{check_range, finish_series, DataError, DataSource, HistoryProvider};
use crate::domain::{PriceBar, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
}

impl From<CsvRow> for PriceBar {
    fn from(row: CsvRow) -> Self {
        PriceBar {
            date: row.date,
            open: row.open.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            volume: row.volume.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }

    /// Read every row of a CSV file into bars, in file order.
    pub fn read_file(path: &Path) -> Result<Vec<PriceBar>, DataError> {
        let csv_err = |e: ::csv::Error| DataError::Csv {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let mut reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(PriceBar::from).map_err(csv_err))
            .collect()
    }
}

impl HistoryProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        check_range(start, end)?;
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }
        debug!(%symbol, path = %path.display(), "reading csv history");
        let bars = Self::read_file(&path)?;
        finish_series(symbol, bars, start, end)
    }
}
