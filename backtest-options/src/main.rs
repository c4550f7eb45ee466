//! # Run a single backtest
//! backtest-options run --strategy pip --data data/spy
//!
//! # Sweep expiry offsets in parallel
//! backtest-options sweep --strategy covered-call --config config/default.toml
//!
//! # Convert LiveVol zip archives into a normalized CSV
//! backtest-options import downloads/livevol --output data/spy

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backtest_options::{
    report, DataLoader, ExecMethod, LiveVolImporter, OptionChainIndex, ParameterSweep, PipOptions,
    RunConfig, StrategyKind,
};

#[derive(Parser)]
#[command(name = "backtest-options")]
#[command(about = "Replay historical option chains through rules-based strategies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one strategy and print its trades and summary
    Run(RunArgs),

    /// Run a strategy across a parameter grid, ranked by total profit
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Only print the best N combinations
        #[arg(long)]
        top: Option<usize>,
    },

    /// Convert a folder of LiveVol zip archives into one normalized CSV
    Import {
        /// Folder holding the `*.zip` archives
        source: PathBuf,

        /// Directory the normalized CSV is written to
        #[arg(short, long, default_value = "data")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Strategy to run (covered-call or pip)
    #[arg(short, long)]
    strategy: Option<StrategyKind>,

    /// Directory of normalized quote CSV files
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First date to trade (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last quote date to open on (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Covered call days to expiry
    #[arg(long)]
    min_exp_days: Option<u32>,

    /// PIP short call days to expiry
    #[arg(long)]
    min_call_dte: Option<u32>,

    /// PIP long put days to expiry
    #[arg(long)]
    min_put_dte: Option<u32>,

    /// Fill method (midpoint or cross-spread)
    #[arg(long)]
    exec_method: Option<ExecMethod>,
}

impl RunArgs {
    /// Load the config file, if any, and apply flag overrides.
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(kind) = self.strategy {
            config.strategy = kind;
        }
        if let Some(data) = &self.data {
            config.data_dir = data.clone();
        }

        let options = &mut config.options;
        if let Some(start) = self.start {
            options.start_date = Some(start);
        }
        if let Some(end) = self.end {
            options.end_date = Some(end);
        }
        if let Some(days) = self.min_exp_days {
            options.min_expiration_days = days;
        }
        if let Some(exec_method) = self.exec_method {
            options.exec_method = exec_method;
        }

        if config.strategy == StrategyKind::Pip || options.pip.is_some() {
            let pip = options.pip.get_or_insert_with(PipOptions::default);
            if let Some(days) = self.min_call_dte {
                pip.min_call_exp_days = days;
            }
            if let Some(days) = self.min_put_dte {
                pip.min_put_exp_days = days;
            }
        }

        Ok(config)
    }
}

fn load_index(config: &RunConfig) -> Result<OptionChainIndex> {
    let quotes = DataLoader::new(&config.data_dir)
        .load_all()
        .with_context(|| format!("Failed to load quotes from {}", config.data_dir.display()))?;
    let index = OptionChainIndex::build(quotes);
    info!(
        "Indexed {} quote dates ({} to {})",
        index.len(),
        index.first_date().map(|d| d.to_string()).unwrap_or_default(),
        index.last_date().map(|d| d.to_string()).unwrap_or_default(),
    );
    Ok(index)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("backtest_options=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = args.resolve()?;
            let index = load_index(&config)?;

            let strategy = config.strategy.build(config.options.clone());
            let run = strategy
                .run(&index)
                .with_context(|| format!("Failed to run {}", config.strategy))?;

            println!("{}", report::render(&run));
        }
        Commands::Sweep { run: args, top } => {
            let config = args.resolve()?;
            let index = load_index(&config)?;

            let outcomes = ParameterSweep::new(config.strategy, config.options.clone())
                .with_param_grid(config.sweep.clone())
                .run(&index);

            let shown = top.unwrap_or(outcomes.len()).min(outcomes.len());
            println!("{}", report::render_sweep(&outcomes[..shown]));
        }
        Commands::Import { source, output } => {
            fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let stamp = Local::now().format("%Y%m%dT%H%M%S");
            let path = output.join(format!("livevol-{stamp}.csv"));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;

            let mut importer = LiveVolImporter::new(BufWriter::new(file))?;
            let stats = importer
                .import_folder(&source)
                .with_context(|| format!("Failed to import {}", source.display()))?;
            importer
                .finish()?
                .flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;

            info!(
                "Wrote {} quotes to {} ({} short rows skipped)",
                stats.rows_written,
                path.display(),
                stats.rows_skipped
            );
        }
    }

    Ok(())
}
