//! Forward-stepping simulation loop.
//!
//! Each step:
//! 1. Find the first quote date on or after the cursor
//! 2. For each option leg, find the first expiry on or after
//!    `quote_date + min_days` and the strike nearest the target price
//! 3. Buy 100 shares and open the option legs on that quote date
//! 4. Move to the shortest leg's expiry and find the quote date there
//! 5. Close stock at min(underlying, short call strike), let short calls
//!    expire at zero, mark longer legs at their current price
//! 6. Continue from that expiry
//!
//! Any lookup miss ends the run with a [`StopReason`].

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::backtest::{
    ClosedLeg, LedgerError, LegRole, OpenLeg, StopReason, StrategyRun, TradeGroup, EQUITY_LOT,
};
use crate::data::{OptionChainIndex, OptionType, QuoteDateChain, QuoteRecord};

use super::{Step, Strategy, StrategyError, StrategyOptions};

/// How an option leg is closed at the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRule {
    /// Expires at the close date; bought back at zero.
    Expire,
    /// Still listed; the same contract is re-quoted on the close date.
    Mark,
}

/// One option leg a strategy opens each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionLegPlan {
    pub role: LegRole,
    pub option_type: OptionType,
    /// Days from the quote date to the target expiry.
    pub min_days: u32,
    /// Target strike as a multiple of the underlying mid.
    pub strike_multiplier: Decimal,
    pub close: CloseRule,
}

enum StepError {
    Stop(StopReason),
    Ledger(LedgerError),
}

impl From<StopReason> for StepError {
    fn from(reason: StopReason) -> Self {
        Self::Stop(reason)
    }
}

impl From<LedgerError> for StepError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

struct Opened<'a> {
    plan: &'a OptionLegPlan,
    quote: &'a QuoteRecord,
    leg: OpenLeg,
}

/// Run a strategy to completion.
pub fn run<S>(strategy: &S, index: &OptionChainIndex) -> Result<StrategyRun, StrategyError>
where
    S: Strategy + ?Sized,
{
    strategy.validate()?;

    let kind = strategy.kind();
    let options = strategy.options();
    let mut result = StrategyRun::new(kind, options.clone());
    let mut cursor = options.start_cursor();

    info!(
        "Running {} over {} quote dates (exec: {}, start: {:?}, end: {:?})",
        kind,
        index.len(),
        options.exec_method,
        options.start_date,
        options.end_date
    );

    loop {
        let group_idx = result.total_trades();
        let step = strategy
            .step(index, cursor)
            .map_err(|source| StrategyError::Ledger {
                group: group_idx,
                source,
            })?;

        match step {
            Step::Emit { group, next_cursor } => {
                debug!(
                    "{} group {}: {} -> {}, profit {}",
                    kind,
                    group_idx,
                    group.open_date(),
                    group.close_date(),
                    group.profit()
                );
                result
                    .push(group)
                    .map_err(|source| StrategyError::Ledger {
                        group: group_idx,
                        source,
                    })?;
                cursor = next_cursor;
            }
            Step::Terminated(reason) => {
                warn!("Stopping {}: {}", kind, reason);
                result.finish(reason);
                break;
            }
        }
    }

    info!(
        "{} finished: {} trades, total profit {}",
        kind,
        result.total_trades(),
        result.total_profit()
    );
    Ok(result)
}

/// Simulate one cycle for the given option legs.
pub fn step(
    index: &OptionChainIndex,
    cursor: NaiveDate,
    options: &StrategyOptions,
    plan: &[OptionLegPlan],
) -> Result<Step, LedgerError> {
    match try_step(index, cursor, options, plan) {
        Ok((group, next_cursor)) => Ok(Step::Emit { group, next_cursor }),
        Err(StepError::Stop(reason)) => Ok(Step::Terminated(reason)),
        Err(StepError::Ledger(err)) => Err(err),
    }
}

fn try_step(
    index: &OptionChainIndex,
    cursor: NaiveDate,
    options: &StrategyOptions,
    plan: &[OptionLegPlan],
) -> Result<(TradeGroup, NaiveDate), StepError> {
    let exec = options.exec_method;

    let chain = index
        .chain_at(cursor, false)
        .ok_or(StopReason::NoQuoteChain { cursor })?;
    let quote_date = chain.quote_date;
    if let Some(end_date) = options.end_date {
        if quote_date > end_date {
            return Err(StopReason::PastEndDate {
                quote_date,
                end_date,
            }
            .into());
        }
    }
    let underlying = chain
        .underlying()
        .ok_or(StopReason::NoUnderlyingPrice { quote_date })?;
    let mid = underlying.mid();

    let mut opened: Vec<Opened<'_>> = Vec::with_capacity(plan.len());
    for leg_plan in plan {
        let target_date = add_days(quote_date, leg_plan.min_days);
        let target_price = mid
            .checked_mul(leg_plan.strike_multiplier)
            .ok_or(LedgerError::LegOverflow {
                role: leg_plan.role,
            })?;
        let quote = find_contract(
            chain,
            target_date,
            target_price,
            leg_plan.option_type,
        )?;

        let price = exec.option_fill(quote, leg_plan.role.side());
        let leg = OpenLeg::new(
            leg_plan.role,
            quote.contract_name(),
            quote_date,
            price,
            Decimal::ONE,
        );
        opened.push(Opened {
            plan: leg_plan,
            quote,
            leg,
        });
    }

    let close_date = opened
        .iter()
        .map(|o| o.quote.expiration)
        .min()
        .ok_or(StopReason::NoExpiry {
            quote_date,
            target: quote_date,
        })?;

    let symbol = opened
        .first()
        .map(|o| o.quote.underlying.clone())
        .unwrap_or_default();
    let stock = OpenLeg::new(
        LegRole::Stock,
        symbol,
        quote_date,
        exec.underlying_fill(&underlying, LegRole::Stock.side()),
        EQUITY_LOT,
    );

    let close_chain = index
        .chain_at(close_date, false)
        .ok_or(StopReason::NoQuoteChain { cursor: close_date })?;
    let close_underlying = close_chain
        .underlying()
        .ok_or(StopReason::NoUnderlyingPrice {
            quote_date: close_chain.quote_date,
        })?;

    // Upside is capped at the lowest short call strike.
    let cap = opened
        .iter()
        .filter(|o| o.plan.role == LegRole::ShortCall)
        .map(|o| o.quote.strike)
        .min();
    let mut stock_close = exec.underlying_fill(&close_underlying, stock.side.opposite());
    if let Some(cap) = cap {
        stock_close = stock_close.min(cap);
    }

    let mut closed: Vec<ClosedLeg> = Vec::with_capacity(opened.len() + 1);
    closed.push(stock.close(close_date, stock_close));
    for o in opened {
        let price = match o.plan.close {
            CloseRule::Expire => Decimal::ZERO,
            CloseRule::Mark => {
                let current = find_contract(
                    close_chain,
                    o.quote.expiration,
                    o.quote.strike,
                    o.plan.option_type,
                )?;
                exec.option_fill(current, o.leg.side.opposite())
            }
        };
        closed.push(o.leg.close(close_date, price));
    }

    let group = TradeGroup::new(closed)?;
    Ok((group, close_date))
}

/// Nearest listed contract: first expiry on or after `target_date`, then
/// the strike closest to `target_price`.
fn find_contract<'a>(
    chain: &'a QuoteDateChain,
    target_date: NaiveDate,
    target_price: Decimal,
    option_type: OptionType,
) -> Result<&'a QuoteRecord, StopReason> {
    let quote_date = chain.quote_date;
    let expiry = chain
        .expiry_at(target_date, false)
        .ok_or(StopReason::NoExpiry {
            quote_date,
            target: target_date,
        })?;
    let strike = expiry
        .strike_at(target_price, false)
        .ok_or(StopReason::NoStrike {
            quote_date,
            expiration: expiry.expiration,
            target: target_price,
        })?;
    strike
        .quote(option_type)
        .ok_or(StopReason::MissingContract {
            quote_date,
            expiration: expiry.expiration,
            strike: strike.strike,
            option_type,
        })
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
