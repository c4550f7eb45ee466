//! Shared quote fixtures for unit tests.

use chrono::NaiveDate;

use super::types::{QuoteRecord, RawQuote};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Build a quote from text; OHLC are zeroed since the engine never reads them.
#[allow(clippy::too_many_arguments)]
pub fn quote(
    quote_date: &str,
    expiration: &str,
    strike: &str,
    option_type: &str,
    ask: &str,
    bid: &str,
    underlying_ask: &str,
    underlying_bid: &str,
) -> QuoteRecord {
    QuoteRecord::parse(RawQuote {
        underlying: "SPY",
        quote_date,
        expiration,
        strike,
        option_type,
        open: "0",
        high: "0",
        low: "0",
        close: "0",
        volume: "0",
        ask,
        bid,
        underlying_ask,
        underlying_bid,
    })
    .unwrap()
}

/// Two quote dates; the 116 call sold on June 1st expires worthless on July 2nd.
pub fn covered_call_single() -> Vec<QuoteRecord> {
    vec![
        quote("2006-06-01", "2006-07-02", "116", "C", "1.1", "0.9", "116.5", "115.5"),
        quote("2006-06-01", "2006-07-02", "116", "P", "0.6", "0.4", "116.5", "115.5"),
        quote("2006-07-02", "2006-07-02", "116", "C", "0", "0", "116.5", "115.5"),
    ]
}

/// Two full covered-call cycles: June 1st -> July 2nd -> August 2nd.
pub fn covered_call_two_cycles() -> Vec<QuoteRecord> {
    vec![
        quote("2006-06-01", "2006-07-02", "116", "C", "1.1", "0.9", "116.5", "115.5"),
        quote("2006-07-02", "2006-07-02", "116", "C", "1", "1", "118.5", "117.5"),
        quote("2006-07-02", "2006-08-02", "118", "C", "1.2", "1.1", "118.5", "117.5"),
        quote("2006-08-02", "2006-08-02", "118", "C", "1", "1", "120", "119.8"),
    ]
}

/// Short weekly call plus a December protective put, rolled twice.
pub fn income_protection() -> Vec<QuoteRecord> {
    vec![
        quote("2006-06-01", "2006-06-08", "116", "C", "1.1", "0.9", "116.5", "115.5"),
        quote("2006-06-01", "2006-12-15", "116", "P", "4.1", "3.8", "116.5", "115.5"),
        quote("2006-06-08", "2006-06-15", "118", "C", "0.8", "0.6", "118.5", "117.5"),
        quote("2006-06-08", "2006-12-15", "118", "P", "3.8", "3.6", "118.5", "117.5"),
        quote("2006-06-15", "2006-12-15", "118", "P", "4.8", "4.6", "116", "115.5"),
    ]
}
