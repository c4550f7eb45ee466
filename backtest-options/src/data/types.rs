//! Core quote types for options backtesting.
//!
//! A [`QuoteRecord`] is one normalized observation of one option contract on
//! one quote date. Every price is an exact decimal parsed from text; nothing
//! in here goes through floating point.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date layout used by the normalized data files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Invalid decimal for {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("Negative value for {field}: {value}")]
    NegativeValue { field: &'static str, value: Decimal },

    #[error("Invalid date for {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Unknown option type: {0:?}")]
    UnknownOptionType(String),
}

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

/// Best bid/ask of the underlying at quote time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl UnderlyingQuote {
    /// Midpoint of bid and ask.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Both sides quoted (non-zero).
    pub fn is_quoted(&self) -> bool {
        !self.bid.is_zero() && !self.ask.is_zero()
    }
}

/// Text fields of one normalized quote row, before parsing.
#[derive(Debug, Clone, Copy)]
pub struct RawQuote<'a> {
    pub underlying: &'a str,
    pub quote_date: &'a str,
    pub expiration: &'a str,
    pub strike: &'a str,
    pub option_type: &'a str,
    pub open: &'a str,
    pub high: &'a str,
    pub low: &'a str,
    pub close: &'a str,
    pub volume: &'a str,
    pub ask: &'a str,
    pub bid: &'a str,
    pub underlying_ask: &'a str,
    pub underlying_bid: &'a str,
}

/// A single option quote at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Underlying symbol (e.g., "SPY")
    pub underlying: String,

    /// Date the contract was quoted
    pub quote_date: NaiveDate,

    /// Option expiration date
    pub expiration: NaiveDate,

    /// Strike price
    pub strike: Decimal,

    /// Option type (call or put)
    pub option_type: OptionType,

    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,

    /// Best ask
    pub ask: Decimal,

    /// Best bid
    pub bid: Decimal,

    /// Traded volume for the session
    pub volume: Decimal,

    /// Underlying bid/ask at quote time
    pub underlying_quote: UnderlyingQuote,
}

impl QuoteRecord {
    /// Parse a quote from its text fields, failing on the first bad field.
    pub fn parse(raw: RawQuote<'_>) -> Result<Self, QuoteError> {
        let option_type = OptionType::from_str(raw.option_type)
            .ok_or_else(|| QuoteError::UnknownOptionType(raw.option_type.to_string()))?;

        Ok(Self {
            underlying: raw.underlying.trim().to_string(),
            quote_date: parse_date("quote_date", raw.quote_date)?,
            expiration: parse_date("expiration", raw.expiration)?,
            strike: parse_price("strike", raw.strike)?,
            option_type,
            open: parse_price("open", raw.open)?,
            high: parse_price("high", raw.high)?,
            low: parse_price("low", raw.low)?,
            close: parse_price("close", raw.close)?,
            ask: parse_price("ask", raw.ask)?,
            bid: parse_price("bid", raw.bid)?,
            volume: parse_decimal("volume", raw.volume)?,
            underlying_quote: UnderlyingQuote {
                bid: parse_decimal("underlying_bid", raw.underlying_bid)?,
                ask: parse_decimal("underlying_ask", raw.underlying_ask)?,
            },
        })
    }

    /// Mid price, (ask + bid) / 2.
    pub fn mid(&self) -> Decimal {
        (self.ask + self.bid) / Decimal::TWO
    }

    /// Contract label used in reports, e.g. `116 C 2006-07-02`.
    pub fn contract_name(&self) -> String {
        format!(
            "{} {} {}",
            self.strike.normalize(),
            self.option_type.as_str(),
            self.expiration.format(DATE_FORMAT)
        )
    }
}

pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, QuoteError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| QuoteError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, QuoteError> {
    Decimal::from_str(value.trim()).map_err(|_| QuoteError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

fn parse_price(field: &'static str, value: &str) -> Result<Decimal, QuoteError> {
    let price = parse_decimal(field, value)?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(QuoteError::NegativeValue { field, value: price });
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw<'a>() -> RawQuote<'a> {
        RawQuote {
            underlying: "SPY",
            quote_date: "2005-01-13",
            expiration: "2005-01-22",
            strike: "117.5",
            option_type: "C",
            open: "20.6",
            high: "20.7",
            low: "20.4",
            close: "20.5",
            volume: "50",
            ask: "20.2",
            bid: "20.1",
            underlying_ask: "117.7",
            underlying_bid: "117.6",
        }
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("P"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("call"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("PUT"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_parse_quote() {
        let quote = QuoteRecord::parse(raw()).unwrap();
        assert_eq!(quote.underlying, "SPY");
        assert_eq!(quote.quote_date, NaiveDate::from_ymd_opt(2005, 1, 13).unwrap());
        assert_eq!(quote.expiration, NaiveDate::from_ymd_opt(2005, 1, 22).unwrap());
        assert_eq!(quote.strike, dec!(117.5));
        assert_eq!(quote.option_type, OptionType::Call);
        assert_eq!(quote.open, dec!(20.6));
        assert_eq!(quote.high, dec!(20.7));
        assert_eq!(quote.low, dec!(20.4));
        assert_eq!(quote.close, dec!(20.5));
        assert_eq!(quote.volume, dec!(50));
        assert_eq!(quote.mid(), dec!(20.15));
        assert_eq!(quote.underlying_quote.mid(), dec!(117.65));
    }

    #[test]
    fn test_parse_rejects_malformed_decimal() {
        let mut bad = raw();
        bad.strike = "11x";
        assert_eq!(
            QuoteRecord::parse(bad),
            Err(QuoteError::InvalidDecimal {
                field: "strike",
                value: "11x".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        let mut bad = raw();
        bad.bid = "-0.05";
        assert!(matches!(
            QuoteRecord::parse(bad),
            Err(QuoteError::NegativeValue { field: "bid", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let mut bad = raw();
        bad.expiration = "2005/01/22";
        assert!(matches!(
            QuoteRecord::parse(bad),
            Err(QuoteError::InvalidDate {
                field: "expiration",
                ..
            })
        ));
    }

    #[test]
    fn test_contract_name() {
        let quote = QuoteRecord::parse(raw()).unwrap();
        assert_eq!(quote.contract_name(), "117.5 C 2005-01-22");
    }

    #[test]
    fn test_underlying_quoted() {
        let und = UnderlyingQuote {
            bid: dec!(0),
            ask: dec!(116.5),
        };
        assert!(!und.is_quoted());
    }
}
