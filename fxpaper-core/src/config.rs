//! Broker configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config.

use crate::domain::InstrumentTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SPREAD_PIPS: f64 = 0.8;
pub const DEFAULT_SLIPPAGE_PIPS: f64 = 0.2;
pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;
pub const DEFAULT_LEDGER_PATH: &str = "runs/paper_ledger.json";

/// How open positions are priced when equity is marked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolicy {
    /// Every position is marked at the current bar's close, whatever its
    /// instrument. Only exact for single-instrument books.
    #[default]
    BarClose,
    /// Each position is marked at the last close seen for its own instrument.
    LastPrice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Full bid/ask spread in pips; fills cross half of it.
    pub spread_pips: f64,
    /// Adverse slippage on market fills, in pips.
    pub slippage_pips: f64,
    /// Commission per one million of notional.
    pub commission_per_million: f64,
    pub initial_cash: f64,
    pub ledger_path: PathBuf,
    pub mark_policy: MarkPolicy,
    pub instruments: InstrumentTable,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            spread_pips: DEFAULT_SPREAD_PIPS,
            slippage_pips: DEFAULT_SLIPPAGE_PIPS,
            commission_per_million: 0.0,
            initial_cash: DEFAULT_INITIAL_CASH,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            mark_policy: MarkPolicy::BarClose,
            instruments: InstrumentTable::default(),
        }
    }
}

impl PaperConfig {
    /// Default settings with the ledger at `ledger_path`.
    pub fn with_ledger(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            ..Self::default()
        }
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PaperConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(format!("serialize: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("spread_pips", self.spread_pips),
            ("slippage_pips", self.slippage_pips),
            ("commission_per_million", self.commission_per_million),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        for (name, inst) in self.instruments.iter() {
            if !inst.pip_size.is_finite() || inst.pip_size <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "instrument {name}: pip_size must be positive, got {}",
                    inst.pip_size
                )));
            }
            if inst.lot_size == 0 {
                return Err(ConfigError::Invalid(format!(
                    "instrument {name}: lot_size must be at least 1"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
