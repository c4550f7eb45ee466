//! Parallel parameter sweeps.
//!
//! Every combination in a [`ParameterGrid`] runs as an independent strategy
//! over the same read-only [`OptionChainIndex`]. Each run owns its own
//! result, so combinations are spread across threads with rayon.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backtest::ExecMethod;
use crate::data::OptionChainIndex;
use crate::metrics::MetricsCalculator;
use crate::strategy::{PipOptions, StrategyKind, StrategyOptions};

/// Parameter values to sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    /// Covered call expiry offsets.
    pub min_expiration_days: Vec<u32>,
    /// PIP short call expiry offsets.
    pub min_call_exp_days: Vec<u32>,
    /// PIP long put expiry offsets.
    pub min_put_exp_days: Vec<u32>,
    /// Fill methods.
    pub exec_methods: Vec<ExecMethod>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            min_expiration_days: vec![14, 21, 28, 35, 45],
            min_call_exp_days: vec![4, 7, 14],
            min_put_exp_days: vec![90, 150, 180, 270],
            exec_methods: vec![ExecMethod::Midpoint],
        }
    }
}

impl ParameterGrid {
    /// Number of combinations swept for a strategy.
    pub fn total_combinations(&self, kind: StrategyKind) -> usize {
        let offsets = match kind {
            StrategyKind::CoveredCall => self.min_expiration_days.len(),
            StrategyKind::Pip => self.min_call_exp_days.len() * self.min_put_exp_days.len(),
        };
        offsets * self.exec_methods.len()
    }

    /// Generate all parameter combinations for a strategy.
    ///
    /// Only the offsets the strategy reads are varied; the rest are left
    /// unset and come from the base options.
    pub fn combinations(&self, kind: StrategyKind) -> Vec<ParameterSet> {
        let mut combos = Vec::with_capacity(self.total_combinations(kind));

        for &exec_method in &self.exec_methods {
            match kind {
                StrategyKind::CoveredCall => {
                    for &days in &self.min_expiration_days {
                        combos.push(ParameterSet {
                            exec_method,
                            min_expiration_days: Some(days),
                            min_call_exp_days: None,
                            min_put_exp_days: None,
                        });
                    }
                }
                StrategyKind::Pip => {
                    for &call_days in &self.min_call_exp_days {
                        for &put_days in &self.min_put_exp_days {
                            if put_days <= call_days {
                                continue;
                            }
                            combos.push(ParameterSet {
                                exec_method,
                                min_expiration_days: None,
                                min_call_exp_days: Some(call_days),
                                min_put_exp_days: Some(put_days),
                            });
                        }
                    }
                }
            }
        }

        combos
    }
}

/// A single parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub exec_method: ExecMethod,
    pub min_expiration_days: Option<u32>,
    pub min_call_exp_days: Option<u32>,
    pub min_put_exp_days: Option<u32>,
}

impl ParameterSet {
    /// Apply this parameter set on top of base options.
    pub fn apply_to_options(&self, base: &StrategyOptions) -> StrategyOptions {
        let mut options = base.clone();
        options.exec_method = self.exec_method;
        if let Some(days) = self.min_expiration_days {
            options.min_expiration_days = days;
        }
        if self.min_call_exp_days.is_some() || self.min_put_exp_days.is_some() {
            let mut pip = options.pip.take().unwrap_or_else(PipOptions::default);
            if let Some(days) = self.min_call_exp_days {
                pip.min_call_exp_days = days;
            }
            if let Some(days) = self.min_put_exp_days {
                pip.min_put_exp_days = days;
            }
            options.pip = Some(pip);
        }
        options
    }

    /// Create a unique key for this parameter set.
    pub fn key(&self) -> String {
        let mut key = self.exec_method.to_string();
        if let Some(days) = self.min_expiration_days {
            key.push_str(&format!("_exp{}", days));
        }
        if let Some(days) = self.min_call_exp_days {
            key.push_str(&format!("_call{}", days));
        }
        if let Some(days) = self.min_put_exp_days {
            key.push_str(&format!("_put{}", days));
        }
        key
    }
}

/// Outcome of one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub params: ParameterSet,
    pub total_trades: usize,
    pub total_profit: Decimal,
    pub max_drawdown: Decimal,
    pub win_rate: f64,
    /// Why the run stopped, if it ran.
    pub stop_reason: Option<String>,
}

/// Runs a strategy across a parameter grid.
pub struct ParameterSweep {
    kind: StrategyKind,
    base_options: StrategyOptions,
    grid: ParameterGrid,
}

impl ParameterSweep {
    pub fn new(kind: StrategyKind, base_options: StrategyOptions) -> Self {
        Self {
            kind,
            base_options,
            grid: ParameterGrid::default(),
        }
    }

    pub fn with_param_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Run every combination in parallel, ranked by total profit
    /// (highest first). Combinations that fail validation are skipped.
    pub fn run(&self, index: &OptionChainIndex) -> Vec<SweepOutcome> {
        let combinations = self.grid.combinations(self.kind);
        let total = combinations.len();
        info!("Sweeping {} {} combinations", total, self.kind);

        let progress = AtomicUsize::new(0);
        let mut outcomes: Vec<SweepOutcome> = combinations
            .par_iter()
            .filter_map(|params| {
                let options = params.apply_to_options(&self.base_options);
                let strategy = self.kind.build(options);
                let result = strategy.run(index);

                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % (total / 10).max(1) == 0 || done == total {
                    let pct = done as f64 / total as f64 * 100.0;
                    info!("  {:.0}% ({}/{} combinations)", pct, done, total);
                }

                match result {
                    Ok(run) => {
                        let metrics = MetricsCalculator::calculate(&run);
                        Some(SweepOutcome {
                            params: params.clone(),
                            total_trades: run.total_trades(),
                            total_profit: run.total_profit(),
                            max_drawdown: metrics.max_drawdown,
                            win_rate: metrics.win_rate,
                            stop_reason: run.stop_reason().map(|r| r.to_string()),
                        })
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", params.key(), e);
                        None
                    }
                }
            })
            .collect();

        outcomes.sort_by(|a, b| {
            b.total_profit
                .cmp(&a.total_profit)
                .then_with(|| a.params.key().cmp(&b.params.key()))
        });

        if let Some(best) = outcomes.first() {
            info!(
                "Best: {} with profit {} over {} trades",
                best.params.key(),
                best.total_profit,
                best.total_trades
            );
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{covered_call_two_cycles, income_protection};
    use rust_decimal_macros::dec;

    #[test]
    fn test_combination_counts() {
        let grid = ParameterGrid::default();
        assert_eq!(grid.combinations(StrategyKind::CoveredCall).len(), 5);
        assert_eq!(grid.total_combinations(StrategyKind::Pip), 12);
        // Every put offset is beyond every call offset in the default grid.
        assert_eq!(grid.combinations(StrategyKind::Pip).len(), 12);
    }

    #[test]
    fn test_apply_to_options() {
        let params = ParameterSet {
            exec_method: ExecMethod::CrossSpread,
            min_expiration_days: None,
            min_call_exp_days: Some(7),
            min_put_exp_days: Some(180),
        };
        let options = params.apply_to_options(&StrategyOptions::default());
        assert_eq!(options.exec_method, ExecMethod::CrossSpread);
        assert_eq!(options.min_expiration_days, 28);
        let pip = options.pip.unwrap();
        assert_eq!(pip.min_call_exp_days, 7);
        assert_eq!(pip.min_put_exp_days, 180);
        assert_eq!(params.key(), "cross-spread_call7_put180");
    }

    #[test]
    fn test_covered_call_sweep_ranked_by_profit() {
        let index = OptionChainIndex::build(covered_call_two_cycles());
        let grid = ParameterGrid {
            min_expiration_days: vec![60, 28, 0],
            ..ParameterGrid::default()
        };
        let outcomes = ParameterSweep::new(StrategyKind::CoveredCall, StrategyOptions::default())
            .with_param_grid(grid)
            .run(&index);

        // Zero days fails validation and is skipped.
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].params.min_expiration_days, Some(28));
        assert_eq!(outcomes[0].total_profit, dec!(215));
        assert_eq!(outcomes[0].total_trades, 2);
        // Nothing on June 1st expires 60 days out.
        assert_eq!(outcomes[1].params.min_expiration_days, Some(60));
        assert_eq!(outcomes[1].total_trades, 0);
        assert!(outcomes[1].stop_reason.is_some());
    }

    #[test]
    fn test_pip_sweep_shares_index() {
        let index = OptionChainIndex::build(income_protection());
        let grid = ParameterGrid {
            min_call_exp_days: vec![4, 8],
            min_put_exp_days: vec![150],
            ..ParameterGrid::default()
        };
        let outcomes = ParameterSweep::new(StrategyKind::Pip, StrategyOptions::default())
            .with_param_grid(grid)
            .run(&index);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].total_profit, dec!(20));
        assert_eq!(outcomes[0].params.min_call_exp_days, Some(4));
        assert_eq!(outcomes[1].total_trades, 0);
    }
}
