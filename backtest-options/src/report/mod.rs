//! Plain-text reports.
//!
//! - Detail table: one row per trade group with leg prices and the running
//!   cumulative profit
//! - Summary table: total profit, trade count, max drawdown, buy-and-hold
//! - Sweep ranking

pub mod table;

use rust_decimal::Decimal;

use crate::backtest::{ClosedLeg, LegRole, StrategyRun};
use crate::metrics::{MetricsCalculator, PerformanceMetrics};
use crate::strategy::StrategyKind;
use crate::sweep::SweepOutcome;

pub use table::{Align, Table};

/// Shortest exact representation, e.g. `1.0` renders as `1`.
fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Two fixed decimal places.
fn fixed2(value: Decimal) -> String {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn leg_cell(leg: Option<&ClosedLeg>, cell: impl Fn(&ClosedLeg) -> String) -> String {
    leg.map(cell).unwrap_or_else(|| "-".to_string())
}

/// Per-group detail table.
pub fn render_trades(run: &StrategyRun) -> String {
    let with_put = run.kind() == StrategyKind::Pip;

    let mut headers = vec!["Open Date", "Close Date", "Call Product"];
    if with_put {
        headers.push("Put Product");
    }
    headers.extend(["Total Profit", "Call Premium", "Call Close Px"]);
    if with_put {
        headers.extend(["Put Open Px", "Put Close Px", "Put Profit"]);
    }
    headers.extend(["Stock Open Px", "Stock Close Px", "Cumulative Profit"]);

    let mut table = Table::new(headers)
        .align(0, Align::Left)
        .align(1, Align::Left)
        .align(2, Align::Left);
    if with_put {
        table = table.align(3, Align::Left);
    }

    let series = MetricsCalculator::cumulative(run.groups());
    for (group, point) in run.groups().iter().zip(&series) {
        let call = group.leg(LegRole::ShortCall);
        let stock = group.leg(LegRole::Stock);

        let mut row = vec![
            group.open_date().to_string(),
            group.close_date().to_string(),
            leg_cell(call, |l| l.open.instrument.clone()),
        ];
        let put = group.leg(LegRole::LongPut);
        if with_put {
            row.push(leg_cell(put, |l| l.open.instrument.clone()));
        }
        row.push(plain(group.profit()));
        row.push(leg_cell(call, |l| plain(l.open_price())));
        row.push(leg_cell(call, |l| plain(l.close_price)));
        if with_put {
            row.push(leg_cell(put, |l| fixed2(l.open_price())));
            row.push(leg_cell(put, |l| fixed2(l.close_price)));
            row.push(leg_cell(put, |l| fixed2(l.close_price - l.open_price())));
        }
        row.push(leg_cell(stock, |l| plain(l.open_price())));
        row.push(leg_cell(stock, |l| plain(l.close_price)));
        row.push(plain(point.cumulative));

        table.push_row(row);
    }

    table.render()
}

/// One-row summary table.
pub fn render_summary(metrics: &PerformanceMetrics) -> String {
    let total_profit = match metrics.total_return_pct {
        Some(pct) => format!("{} ({}%)", fixed2(metrics.total_profit), fixed2(pct)),
        None => fixed2(metrics.total_profit),
    };
    let buy_and_hold = metrics
        .buy_and_hold
        .as_ref()
        .map(|b| format!("{} ({}%)", fixed2(b.profit), fixed2(b.return_pct)))
        .unwrap_or_else(|| "n/a".to_string());

    let mut table = Table::new(["Total Profit", "Total Trades", "Max Drawdown", "Buy & Hold"]);
    table.push_row(vec![
        total_profit,
        metrics.total_trades.to_string(),
        format!("{}%", fixed2(metrics.max_drawdown_pct())),
        buy_and_hold,
    ]);
    table.render()
}

/// Full report for one run: header, detail, summary and stop reason.
pub fn render(run: &StrategyRun) -> String {
    let metrics = MetricsCalculator::calculate(run);
    let options = run.options();

    let mut out = format!("## {} ({})\n\n", run.kind(), options.exec_method);
    out.push_str(&render_trades(run));
    out.push('\n');
    out.push_str(&render_summary(&metrics));
    if let Some(reason) = run.stop_reason() {
        out.push_str(&format!("\nStopped: {}\n", reason));
    }
    out
}

/// Sweep outcomes in ranked order.
pub fn render_sweep(outcomes: &[SweepOutcome]) -> String {
    let mut table = Table::new([
        "Rank",
        "Parameters",
        "Trades",
        "Total Profit",
        "Max Drawdown",
        "Win Rate",
    ])
    .align(1, Align::Left);

    for (i, outcome) in outcomes.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            outcome.params.key(),
            outcome.total_trades.to_string(),
            fixed2(outcome.total_profit),
            format!("{}%", fixed2(outcome.max_drawdown * Decimal::ONE_HUNDRED)),
            format!("{:.1}%", outcome.win_rate * 100.0),
        ]);
    }
    table.render()
}
