//! Outcome of one strategy run.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::data::OptionType;
use crate::strategy::{StrategyKind, StrategyOptions};

use super::trade::{LedgerError, TradeGroup};

/// Why the simulation loop stopped.
///
/// Every variant is a normal end of data, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum StopReason {
    /// No quote date on or after the cursor.
    NoQuoteChain { cursor: NaiveDate },

    /// The quote date never carried a two-sided underlying quote.
    NoUnderlyingPrice { quote_date: NaiveDate },

    /// No expiration on or after the target.
    NoExpiry {
        quote_date: NaiveDate,
        target: NaiveDate,
    },

    /// Every listed strike is below the target price.
    NoStrike {
        quote_date: NaiveDate,
        expiration: NaiveDate,
        target: Decimal,
    },

    /// The nearest strike was listed without the needed call or put.
    MissingContract {
        quote_date: NaiveDate,
        expiration: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
    },

    /// The next quote date is past the configured end date.
    PastEndDate {
        quote_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQuoteChain { cursor } => {
                write!(f, "no quotes on or after {}", cursor)
            }
            Self::NoUnderlyingPrice { quote_date } => {
                write!(f, "no underlying price on {}", quote_date)
            }
            Self::NoExpiry { quote_date, target } => write!(
                f,
                "no expiration on or after {} for quote date {}",
                target, quote_date
            ),
            Self::NoStrike {
                quote_date,
                expiration,
                target,
            } => write!(
                f,
                "no strike near {} expiring {} for quote date {}",
                target, expiration, quote_date
            ),
            Self::MissingContract {
                quote_date,
                expiration,
                strike,
                option_type,
            } => write!(
                f,
                "no {} {} {} quoted on {}",
                strike.normalize(),
                option_type.as_str(),
                expiration,
                quote_date
            ),
            Self::PastEndDate {
                quote_date,
                end_date,
            } => write!(f, "quote date {} is after end date {}", quote_date, end_date),
        }
    }
}

/// Ordered trade groups plus running totals for one strategy invocation.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    kind: StrategyKind,
    options: StrategyOptions,
    groups: Vec<TradeGroup>,
    total_trades: usize,
    total_profit: Decimal,
    stop_reason: Option<StopReason>,
}

impl StrategyRun {
    pub fn new(kind: StrategyKind, options: StrategyOptions) -> Self {
        Self {
            kind,
            options,
            groups: Vec::new(),
            total_trades: 0,
            total_profit: Decimal::ZERO,
            stop_reason: None,
        }
    }

    /// Append a completed group and accumulate totals.
    pub fn push(&mut self, group: TradeGroup) -> Result<(), LedgerError> {
        self.total_profit = self
            .total_profit
            .checked_add(group.profit())
            .ok_or(LedgerError::GroupOverflow)?;
        self.total_trades += 1;
        self.groups.push(group);
        Ok(())
    }

    /// Record why the loop ended. The run is complete afterwards.
    pub(crate) fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn options(&self) -> &StrategyOptions {
        &self.options
    }

    pub fn groups(&self) -> &[TradeGroup] {
        &self.groups
    }

    pub fn total_trades(&self) -> usize {
        self.total_trades
    }

    pub fn total_profit(&self) -> Decimal {
        self.total_profit
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::trade::{LegRole, OpenLeg};
    use rust_decimal_macros::dec;

    fn group(open: Decimal, close: Decimal) -> TradeGroup {
        let d1 = NaiveDate::from_ymd_opt(2006, 6, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2006, 7, 2).unwrap();
        let leg = OpenLeg::new(LegRole::ShortCall, "116 C", d1, open, dec!(1)).close(d2, close);
        TradeGroup::new([leg]).unwrap()
    }

    #[test]
    fn test_push_accumulates() {
        let mut run = StrategyRun::new(StrategyKind::CoveredCall, StrategyOptions::default());
        assert!(run.is_empty());

        run.push(group(dec!(1.0), dec!(0))).unwrap();
        run.push(group(dec!(1.15), dec!(0))).unwrap();
        run.push(group(dec!(0.5), dec!(1.2))).unwrap();

        assert_eq!(run.total_trades(), 3);
        assert_eq!(run.groups().len(), 3);
        assert_eq!(run.total_profit(), dec!(145));
        assert_eq!(run.stop_reason(), None);
    }

    #[test]
    fn test_stop_reason_display() {
        let reason = StopReason::MissingContract {
            quote_date: NaiveDate::from_ymd_opt(2006, 6, 15).unwrap(),
            expiration: NaiveDate::from_ymd_opt(2006, 12, 15).unwrap(),
            strike: dec!(118.000),
            option_type: OptionType::Call,
        };
        assert_eq!(reason.to_string(), "no 118 C 2006-12-15 quoted on 2006-06-15");
    }
}
