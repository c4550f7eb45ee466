//! Performance metrics calculator.
//!
//! Turns a completed [`StrategyRun`] into summary statistics: totals,
//! win/loss breakdown, max drawdown of the cumulative profit curve, and a
//! buy-and-hold comparison over the same span.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::backtest::{LegRole, StrategyRun, TradeGroup, EQUITY_LOT};

/// Cumulative profit after one trade group closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativePoint {
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub profit: Decimal,
    pub cumulative: Decimal,
}

/// Holding the stock from the first open to the last close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyAndHold {
    pub first_price: Decimal,
    pub last_price: Decimal,
    /// (last - first) x lot size.
    pub profit: Decimal,
    /// first x lot size.
    pub notional: Decimal,
    /// profit / notional x 100.
    pub return_pct: Decimal,
}

/// Summary statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    // Basic statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,

    // P&L metrics
    pub total_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub avg_trade_profit: Decimal,
    pub largest_winner: Decimal,
    pub largest_loser: Decimal,

    /// Total profit as a percentage of the initial stock notional.
    pub total_return_pct: Option<Decimal>,

    /// Largest peak-to-trough decline of cumulative profit as a fraction
    /// of the peak, e.g. 0.25 for a 25% drawdown.
    pub max_drawdown: Decimal,

    pub buy_and_hold: Option<BuyAndHold>,

    pub avg_days_in_trade: f64,
}

impl PerformanceMetrics {
    /// Max drawdown as a percentage.
    pub fn max_drawdown_pct(&self) -> Decimal {
        self.max_drawdown * Decimal::ONE_HUNDRED
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let pct = |v: Option<Decimal>| {
            v.map(|p| format!("{:.2}%", p))
                .unwrap_or_else(|| "n/a".to_string())
        };
        let buy_and_hold = self
            .buy_and_hold
            .as_ref()
            .map(|b| format!("{:.2} ({:.2}%)", b.profit, b.return_pct))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "Performance Summary\n\
             ====================\n\
             \n\
             Trades: {} (W: {}, L: {}, BE: {})\n\
             Win Rate: {:.1}%\n\
             \n\
             Total Profit: {:.2} ({})\n\
             Avg Trade: {:.2}\n\
             Largest Win: {:.2}\n\
             Largest Loss: {:.2}\n\
             \n\
             Max Drawdown: {:.2}%\n\
             Buy & Hold: {}\n\
             Avg Days in Trade: {:.1}",
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.breakeven_trades,
            self.win_rate * 100.0,
            self.total_profit,
            pct(self.total_return_pct),
            self.avg_trade_profit,
            self.largest_winner,
            self.largest_loser,
            self.max_drawdown_pct(),
            buy_and_hold,
            self.avg_days_in_trade,
        )
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics from a run.
    pub fn calculate(run: &StrategyRun) -> PerformanceMetrics {
        let groups = run.groups();

        let total_trades = groups.len();
        let winning_trades = groups.iter().filter(|g| g.profit() > Decimal::ZERO).count();
        let losing_trades = groups.iter().filter(|g| g.profit() < Decimal::ZERO).count();
        let breakeven_trades = total_trades - winning_trades - losing_trades;
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let total_profit = run.total_profit();
        let gross_profit: Decimal = groups
            .iter()
            .map(|g| g.profit())
            .filter(|p| *p > Decimal::ZERO)
            .sum();
        let gross_loss: Decimal = groups
            .iter()
            .map(|g| g.profit())
            .filter(|p| *p < Decimal::ZERO)
            .sum();

        let avg_trade_profit = if total_trades > 0 {
            total_profit / Decimal::from(total_trades as i64)
        } else {
            Decimal::ZERO
        };

        let largest_winner = groups
            .iter()
            .map(|g| g.profit())
            .filter(|p| *p > Decimal::ZERO)
            .max()
            .unwrap_or(Decimal::ZERO);
        let largest_loser = groups
            .iter()
            .map(|g| g.profit())
            .filter(|p| *p < Decimal::ZERO)
            .min()
            .unwrap_or(Decimal::ZERO);

        let buy_and_hold = Self::buy_and_hold(groups);
        let total_return_pct = buy_and_hold
            .as_ref()
            .filter(|b| !b.notional.is_zero())
            .map(|b| total_profit / b.notional * Decimal::ONE_HUNDRED);

        let avg_days_in_trade = if total_trades > 0 {
            groups
                .iter()
                .map(|g| (g.close_date() - g.open_date()).num_days() as f64)
                .sum::<f64>()
                / total_trades as f64
        } else {
            0.0
        };

        PerformanceMetrics {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate,
            total_profit,
            gross_profit,
            gross_loss,
            avg_trade_profit,
            largest_winner,
            largest_loser,
            total_return_pct,
            max_drawdown: Self::max_drawdown(groups),
            buy_and_hold,
            avg_days_in_trade,
        }
    }

    /// Running cumulative profit, one point per group.
    pub fn cumulative(groups: &[TradeGroup]) -> Vec<CumulativePoint> {
        let mut cumulative = Decimal::ZERO;
        groups
            .iter()
            .map(|g| {
                cumulative += g.profit();
                CumulativePoint {
                    open_date: g.open_date(),
                    close_date: g.close_date(),
                    profit: g.profit(),
                    cumulative,
                }
            })
            .collect()
    }

    /// Largest decline of cumulative profit from its running peak, as a
    /// fraction of that peak. Nothing counts until the peak is positive.
    pub fn max_drawdown(groups: &[TradeGroup]) -> Decimal {
        let mut cumulative = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;

        for group in groups {
            cumulative += group.profit();
            if cumulative > peak {
                // New high
                peak = cumulative;
            } else if peak > Decimal::ZERO {
                let drawdown = Decimal::ONE - cumulative / peak;
                max_drawdown = max_drawdown.max(drawdown);
            }
        }

        max_drawdown
    }

    /// Stock bought at the first group's open and sold at the last group's
    /// close, sized like one equity leg.
    pub fn buy_and_hold(groups: &[TradeGroup]) -> Option<BuyAndHold> {
        let first_price = groups.first()?.leg(LegRole::Stock)?.open_price();
        let last_price = groups.last()?.leg(LegRole::Stock)?.close_price;

        let profit = (last_price - first_price) * EQUITY_LOT;
        let notional = first_price * EQUITY_LOT;
        let return_pct = if notional.is_zero() {
            Decimal::ZERO
        } else {
            profit / notional * Decimal::ONE_HUNDRED
        };

        Some(BuyAndHold {
            first_price,
            last_price,
            profit,
            notional,
            return_pct,
        })
    }
}
