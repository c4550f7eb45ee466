//! Put income protection: long stock, a short near-dated call rolled every
//! cycle, and a long far-dated put marked to market at each roll.

use chrono::NaiveDate;

use crate::backtest::{LedgerError, LegRole};
use crate::data::{OptionChainIndex, OptionType};

use super::engine::{self, CloseRule, OptionLegPlan};
use super::{
    require_positive_days, require_positive_multiplier, PipOptions, Step, Strategy,
    StrategyError, StrategyKind, StrategyOptions,
};

pub struct Pip {
    options: StrategyOptions,
}

impl Pip {
    pub fn new(options: StrategyOptions) -> Self {
        Self { options }
    }

    fn pip_options(&self) -> PipOptions {
        self.options.pip.clone().unwrap_or_default()
    }

    fn plan(&self) -> [OptionLegPlan; 2] {
        let pip = self.pip_options();
        [
            OptionLegPlan {
                role: LegRole::ShortCall,
                option_type: OptionType::Call,
                min_days: pip.min_call_exp_days,
                strike_multiplier: pip.target_call_multiplier,
                close: CloseRule::Expire,
            },
            OptionLegPlan {
                role: LegRole::LongPut,
                option_type: OptionType::Put,
                min_days: pip.min_put_exp_days,
                strike_multiplier: pip.target_put_multiplier,
                close: CloseRule::Mark,
            },
        ]
    }
}

impl Strategy for Pip {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pip
    }

    fn options(&self) -> &StrategyOptions {
        &self.options
    }

    fn validate(&self) -> Result<(), StrategyError> {
        self.options.validate_dates()?;
        let pip = self
            .options
            .pip
            .as_ref()
            .ok_or(StrategyError::MissingOption("pip"))?;
        require_positive_days("min_call_exp_days", pip.min_call_exp_days)?;
        require_positive_days("min_put_exp_days", pip.min_put_exp_days)?;
        require_positive_multiplier("target_call_multiplier", pip.target_call_multiplier)?;
        require_positive_multiplier("target_put_multiplier", pip.target_put_multiplier)
    }

    fn step(&self, index: &OptionChainIndex, cursor: NaiveDate) -> Result<Step, LedgerError> {
        engine::step(index, cursor, &self.options, &self.plan())
    }
}
