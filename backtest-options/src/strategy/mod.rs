//! Rules-based options strategies.
//!
//! A strategy walks forward through an [`OptionChainIndex`] one cycle at a
//! time: open a stock position plus option legs on the current quote date,
//! close everything at the shortest leg's expiry, then repeat from there.
//! Two variants are provided:
//! - [`CoveredCall`]: long stock, short call
//! - [`Pip`]: long stock, short weekly call, long far-dated put

pub mod covered_call;
pub mod engine;
pub mod pip;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::{ExecMethod, LedgerError, StrategyRun, TradeGroup};
use crate::data::OptionChainIndex;

pub use crate::backtest::StopReason;
pub use covered_call::CoveredCall;
pub use engine::{CloseRule, OptionLegPlan};
pub use pip::Pip;

/// Default days between quote date and target expiry for covered calls.
pub const DEFAULT_MIN_EXPIRATION_DAYS: u32 = 28;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error("Invalid option {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    #[error("Ledger error in trade group {group}: {source}")]
    Ledger {
        group: usize,
        #[source]
        source: LedgerError,
    },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Which strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    CoveredCall,
    Pip,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoveredCall => "covered-call",
            Self::Pip => "pip",
        }
    }

    /// Construct the strategy for these options.
    pub fn build(self, options: StrategyOptions) -> Box<dyn Strategy> {
        match self {
            Self::CoveredCall => Box::new(CoveredCall::new(options)),
            Self::Pip => Box::new(Pip::new(options)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "covered-call" | "coveredcall" | "cc" => Ok(Self::CoveredCall),
            "pip" => Ok(Self::Pip),
            other => Err(StrategyError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Options for the put-income-protection variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipOptions {
    /// Days from quote date to the short call's target expiry.
    pub min_call_exp_days: u32,
    /// Days from quote date to the long put's target expiry.
    pub min_put_exp_days: u32,
    /// Short call strike target as a multiple of the underlying mid.
    pub target_call_multiplier: Decimal,
    /// Long put strike target as a multiple of the underlying mid.
    pub target_put_multiplier: Decimal,
}

impl Default for PipOptions {
    fn default() -> Self {
        Self {
            min_call_exp_days: 4,
            min_put_exp_days: 150,
            target_call_multiplier: Decimal::ONE,
            target_put_multiplier: Decimal::ONE,
        }
    }
}

/// Options shared by every strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    /// Fill pricing for every leg.
    pub exec_method: ExecMethod,

    /// Days from quote date to the covered call's target expiry.
    pub min_expiration_days: u32,

    /// First date to trade; the earliest quote date when unset.
    pub start_date: Option<NaiveDate>,

    /// Stop before opening on a quote date after this.
    pub end_date: Option<NaiveDate>,

    /// Put-income-protection settings.
    pub pip: Option<PipOptions>,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            exec_method: ExecMethod::default(),
            min_expiration_days: DEFAULT_MIN_EXPIRATION_DAYS,
            start_date: None,
            end_date: None,
            pip: None,
        }
    }
}

impl StrategyOptions {
    /// Checks shared by every variant.
    pub fn validate_dates(&self) -> Result<(), StrategyError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(StrategyError::InvalidOption {
                    field: "end_date",
                    reason: format!("{} is before start date {}", end, start),
                });
            }
        }
        Ok(())
    }

    /// Date the first step looks up.
    pub fn start_cursor(&self) -> NaiveDate {
        self.start_date.unwrap_or(NaiveDate::MIN)
    }
}

/// Result of one forward step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A full cycle was opened and closed; continue from `next_cursor`.
    Emit {
        group: TradeGroup,
        next_cursor: NaiveDate,
    },
    /// A lookup missed; the run is over.
    Terminated(StopReason),
}

/// A strategy that can be stepped through an option chain index.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn options(&self) -> &StrategyOptions;

    /// Reject unusable options before any step runs.
    fn validate(&self) -> Result<(), StrategyError>;

    /// Open and close one cycle starting at the first quote date on or
    /// after `cursor`.
    fn step(&self, index: &OptionChainIndex, cursor: NaiveDate) -> Result<Step, LedgerError>;

    /// Validate, then step until a lookup misses.
    fn run(&self, index: &OptionChainIndex) -> Result<StrategyRun, StrategyError> {
        engine::run(self, index)
    }
}

pub(crate) fn require_positive_days(field: &'static str, days: u32) -> Result<(), StrategyError> {
    if days == 0 {
        return Err(StrategyError::InvalidOption {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_positive_multiplier(
    field: &'static str,
    value: Decimal,
) -> Result<(), StrategyError> {
    if value <= Decimal::ZERO {
        return Err(StrategyError::InvalidOption {
            field,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}
