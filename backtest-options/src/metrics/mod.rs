//! Result aggregation.
//!
//! - Win/loss counts and profit totals
//! - Max drawdown of the cumulative profit curve
//! - Buy-and-hold comparison

pub mod calculator;

pub use calculator::{BuyAndHold, CumulativePoint, MetricsCalculator, PerformanceMetrics};
