pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod report;
pub mod strategy;
pub mod sweep;

// Re-export commonly used types
pub use backtest::{ExecMethod, StopReason, StrategyRun, TradeGroup};
pub use config::{ConfigError, RunConfig};
pub use data::{DataLoader, LiveVolImporter, OptionChainIndex, OptionType, QuoteRecord};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use strategy::{CoveredCall, Pip, PipOptions, Strategy, StrategyKind, StrategyOptions};
pub use sweep::{ParameterGrid, ParameterSweep, SweepOutcome};
