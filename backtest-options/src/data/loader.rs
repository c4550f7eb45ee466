//! Loader for normalized option quote CSV files.
//!
//! One row per option contract per quote date, with a header row and the
//! following leading columns (anything after `underlying_ask` is ignored):
//! - underlying_symbol, quote_date, expiration, strike, option_type
//! - open, high, low, close, trade_volume
//! - bid_size, bid, ask_size, ask
//! - underlying_bid, underlying_ask
//!
//! Loading is all-or-nothing: the first malformed row aborts the batch.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::types::{QuoteError, QuoteRecord, RawQuote};

/// Column names written by the normalizer, in order.
pub const NORMALIZED_COLUMNS: &[&str] = &[
    "underlying_symbol",
    "quote_date",
    "expiration",
    "strike",
    "option_type",
    "open",
    "high",
    "low",
    "close",
    "trade_volume",
    "bid_size_1545",
    "bid_1545",
    "ask_size_1545",
    "ask_1545",
    "underlying_bid_1545",
    "underlying_ask_1545",
    "vwap",
    "open_interest",
    "delivery_code",
];

const COL_UNDERLYING: usize = 0;
const COL_QUOTE_DATE: usize = 1;
const COL_EXPIRATION: usize = 2;
const COL_STRIKE: usize = 3;
const COL_OPTION_TYPE: usize = 4;
const COL_OPEN: usize = 5;
const COL_HIGH: usize = 6;
const COL_LOW: usize = 7;
const COL_CLOSE: usize = 8;
const COL_VOLUME: usize = 9;
const COL_BID: usize = 11;
const COL_ASK: usize = 13;
const COL_UNDERLYING_BID: usize = 14;
const COL_UNDERLYING_ASK: usize = 15;

/// Fewest columns a row may carry.
pub const MIN_COLUMNS: usize = COL_UNDERLYING_ASK + 1;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("No quote files found in {0}")]
    NoData(String),

    #[error("Expected at least {expected} columns but got {got} on row {row}")]
    TooFewColumns {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Malformed field on row {row}: {source}")]
    Quote {
        row: usize,
        #[source]
        source: QuoteError,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read every quote from a normalized CSV stream.
///
/// Row numbers in errors are 1-based and count the header.
pub fn read_quotes<R: Read>(reader: R) -> Result<Vec<QuoteRecord>, LoaderError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut quotes = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        // +1 for the header, +1 for 1-based numbering.
        quotes.push(parse_row(&row, idx + 2)?);
    }
    Ok(quotes)
}

/// Parse one CSV record into a quote.
pub fn parse_row(row: &csv::StringRecord, row_number: usize) -> Result<QuoteRecord, LoaderError> {
    if row.len() < MIN_COLUMNS {
        return Err(LoaderError::TooFewColumns {
            row: row_number,
            expected: MIN_COLUMNS,
            got: row.len(),
        });
    }

    let raw = RawQuote {
        underlying: &row[COL_UNDERLYING],
        quote_date: &row[COL_QUOTE_DATE],
        expiration: &row[COL_EXPIRATION],
        strike: &row[COL_STRIKE],
        option_type: &row[COL_OPTION_TYPE],
        open: &row[COL_OPEN],
        high: &row[COL_HIGH],
        low: &row[COL_LOW],
        close: &row[COL_CLOSE],
        volume: &row[COL_VOLUME],
        ask: &row[COL_ASK],
        bid: &row[COL_BID],
        underlying_ask: &row[COL_UNDERLYING_ASK],
        underlying_bid: &row[COL_UNDERLYING_BID],
    };

    QuoteRecord::parse(raw).map_err(|source| LoaderError::Quote {
        row: row_number,
        source,
    })
}

/// Loads normalized quote files from a data directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    /// Create a loader pointing at a directory of normalized CSV files.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List `*.csv` files in the data directory, sorted by name.
    pub fn quote_files(&self) -> Result<Vec<PathBuf>, LoaderError> {
        if !self.data_dir.is_dir() {
            return Err(LoaderError::DirectoryNotFound(
                self.data_dir.display().to_string(),
            ));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every quote from a single file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<QuoteRecord>, LoaderError> {
        let file = File::open(path)?;
        let quotes = read_quotes(file)?;
        debug!("Read {} quotes from {}", quotes.len(), path.display());
        Ok(quotes)
    }

    /// Load every quote from every file in the data directory.
    pub fn load_all(&self) -> Result<Vec<QuoteRecord>, LoaderError> {
        let files = self.quote_files()?;
        if files.is_empty() {
            return Err(LoaderError::NoData(self.data_dir.display().to_string()));
        }

        info!("Reading {} files from {}", files.len(), self.data_dir.display());
        let mut quotes = Vec::new();
        for path in &files {
            quotes.extend(self.load_file(path)?);
        }
        info!("Loaded {} quotes", quotes.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const HEADER: &str = "underlying_symbol,quote_date,expiration,strike,option_type,open,high,low,close,trade_volume,bid_size_1545,bid_1545,ask_size_1545,ask_1545,underlying_bid_1545,underlying_ask_1545,vwap,open_interest,delivery_code";

    fn load_str(body: &str) -> Result<Vec<QuoteRecord>, LoaderError> {
        let data = format!("{}\n{}", HEADER, body);
        read_quotes(data.as_bytes())
    }

    #[test]
    fn test_expected_columns() {
        assert_eq!(NORMALIZED_COLUMNS.len(), 19);
        assert_eq!(NORMALIZED_COLUMNS[COL_UNDERLYING_ASK], "underlying_ask_1545");
        assert_eq!(NORMALIZED_COLUMNS[COL_BID], "bid_1545");
        assert_eq!(MIN_COLUMNS, 16);
    }

    #[test]
    fn test_read_normalized_row() {
        let quotes = load_str(
            "SPY,2005-01-10,2005-01-22,130.000,C,1.0000,2.0000,0.0000,1.0000,1200,0,0.0000,195,0.0500,118.9400,118.9500,0.0000,0,",
        )
        .unwrap();

        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert_eq!(q.underlying, "SPY");
        assert_eq!(q.quote_date, NaiveDate::from_ymd_opt(2005, 1, 10).unwrap());
        assert_eq!(q.expiration, NaiveDate::from_ymd_opt(2005, 1, 22).unwrap());
        assert_eq!(q.strike, dec!(130));
        assert_eq!(q.option_type, OptionType::Call);
        assert_eq!(q.open, dec!(1));
        assert_eq!(q.high, dec!(2));
        assert_eq!(q.low, dec!(0));
        assert_eq!(q.close, dec!(1));
        assert_eq!(q.volume, dec!(1200));
        assert_eq!(q.bid, dec!(0));
        assert_eq!(q.ask, dec!(0.05));
        assert_eq!(q.mid(), dec!(0.025));
        assert_eq!(q.underlying_quote.bid, dec!(118.94));
        assert_eq!(q.underlying_quote.ask, dec!(118.95));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let err = load_str("SPY,2005-01-10,2005-01-22,130.000,C,1,2,0,1").unwrap_err();
        match err {
            LoaderError::TooFewColumns { row, expected, got } => {
                assert_eq!(row, 2);
                assert_eq!(expected, 16);
                assert_eq!(got, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_decimal_aborts_batch() {
        let body = "SPY,2005-01-10,2005-01-22,130,C,1,2,0,1,1200,0,0,195,0.05,118.94,118.95\n\
                    SPY,2005-01-10,2005-01-22,abc,C,1,2,0,1,1200,0,0,195,0.05,118.94,118.95";
        let err = load_str(body).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Quote {
                row: 3,
                source: QuoteError::InvalidDecimal { field: "strike", .. }
            }
        ));
    }

    #[test]
    fn test_unknown_option_type_rejected() {
        let err = load_str("SPY,2005-01-10,2005-01-22,130,X,1,2,0,1,1200,0,0,195,0.05,118.94,118.95")
            .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Quote {
                source: QuoteError::UnknownOptionType(_),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_directory() {
        let loader = DataLoader::new("/nonexistent/backtest-options-data");
        assert!(matches!(
            loader.load_all(),
            Err(LoaderError::DirectoryNotFound(_))
        ));
    }
}
