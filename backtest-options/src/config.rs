//! Run configuration loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::{StrategyKind, StrategyOptions};
use crate::sweep::ParameterGrid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for a backtest run or sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of normalized quote CSV files.
    pub data_dir: PathBuf,

    /// Strategy to run.
    pub strategy: StrategyKind,

    /// Strategy options.
    pub options: StrategyOptions,

    /// Grid used by `sweep`.
    pub sweep: ParameterGrid,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            strategy: StrategyKind::CoveredCall,
            options: StrategyOptions::default(),
            sweep: ParameterGrid::default(),
        }
    }
}

impl RunConfig {
    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
