//! Execution ledger for options strategies.
//!
//! - Legs, sides, products and trade groups
//! - Fill pricing (midpoint or cross-spread)
//! - The run result: ordered groups, running totals, stop reason

pub mod fill;
pub mod result;
pub mod trade;

pub use fill::ExecMethod;
pub use result::{StopReason, StrategyRun};
pub use trade::{
    ClosedLeg, LedgerError, LegRole, OpenLeg, ProductKind, Side, TradeGroup, CONTRACT_MULTIPLIER,
    EQUITY_LOT,
};
