//! Execution-fill pricing.
//!
//! | Method         | Buy fill | Sell fill |
//! |----------------|----------|-----------|
//! | `midpoint`     | mid      | mid       |
//! | `cross-spread` | ask      | bid       |
//!
//! The same rule prices options and the underlying.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{QuoteRecord, UnderlyingQuote};

use super::trade::Side;

/// How a leg's opening and closing prices are derived from bid/ask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecMethod {
    /// Fill at (ask + bid) / 2.
    #[default]
    Midpoint,
    /// Pay the ask when buying, hit the bid when selling.
    CrossSpread,
}

impl ExecMethod {
    /// Fill price for a transaction against a bid/ask pair.
    pub fn fill(&self, bid: Decimal, ask: Decimal, side: Side) -> Decimal {
        match (self, side) {
            (Self::Midpoint, _) => (ask + bid) / Decimal::TWO,
            (Self::CrossSpread, Side::Buy) => ask,
            (Self::CrossSpread, Side::Sell) => bid,
        }
    }

    pub fn option_fill(&self, quote: &QuoteRecord, side: Side) -> Decimal {
        self.fill(quote.bid, quote.ask, side)
    }

    pub fn underlying_fill(&self, quote: &UnderlyingQuote, side: Side) -> Decimal {
        self.fill(quote.bid, quote.ask, side)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Midpoint => "midpoint",
            Self::CrossSpread => "cross-spread",
        }
    }
}

impl fmt::Display for ExecMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "midpoint" | "mid" => Ok(Self::Midpoint),
            "cross-spread" | "cross" => Ok(Self::CrossSpread),
            other => Err(format!(
                "unknown exec method {other:?} (expected midpoint or cross-spread)"
            )),
        }
    }
}
