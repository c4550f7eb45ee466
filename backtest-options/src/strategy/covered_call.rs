//! Covered call: buy 100 shares, write one at-the-money call, hold to expiry.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::backtest::{LedgerError, LegRole};
use crate::data::{OptionChainIndex, OptionType};

use super::engine::{self, CloseRule, OptionLegPlan};
use super::{require_positive_days, Step, Strategy, StrategyError, StrategyKind, StrategyOptions};

pub struct CoveredCall {
    options: StrategyOptions,
}

impl CoveredCall {
    pub fn new(options: StrategyOptions) -> Self {
        Self { options }
    }

    fn plan(&self) -> [OptionLegPlan; 1] {
        [OptionLegPlan {
            role: LegRole::ShortCall,
            option_type: OptionType::Call,
            min_days: self.options.min_expiration_days,
            strike_multiplier: Decimal::ONE,
            close: CloseRule::Expire,
        }]
    }
}

impl Strategy for CoveredCall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoveredCall
    }

    fn options(&self) -> &StrategyOptions {
        &self.options
    }

    fn validate(&self) -> Result<(), StrategyError> {
        self.options.validate_dates()?;
        require_positive_days("min_expiration_days", self.options.min_expiration_days)
    }

    fn step(&self, index: &OptionChainIndex, cursor: NaiveDate) -> Result<Step, LedgerError> {
        engine::step(index, cursor, &self.options, &self.plan())
    }
}
