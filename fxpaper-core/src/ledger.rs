//! Ledger store: whole-state JSON persistence.
//!
//! Layout: a single JSON document at the configured path with top-level
//! `cash, equity, positions, open_orders, history, last_mark`.
//!
//! Features:
//! - Atomic writes (write to `.tmp`, fsync, rename into place)
//! - Missing file → fresh state at the initial cash
//! - Missing fields → defaults derived from the initial cash
//! - A document that is not valid JSON is reported, never silently replaced

use crate::domain::{AccountState, Order, Position, TradeRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk shape with every field optional, so partially written or older
/// ledgers still load.
#[derive(Debug, Default, Deserialize)]
struct LedgerDocument {
    cash: Option<f64>,
    equity: Option<f64>,
    #[serde(default)]
    positions: BTreeMap<String, Position>,
    #[serde(default)]
    open_orders: Vec<Order>,
    #[serde(default)]
    history: Vec<TradeRecord>,
    #[serde(default)]
    last_mark: Option<DateTime<Utc>>,
    #[serde(default)]
    last_prices: BTreeMap<String, f64>,
    #[serde(default)]
    order_seq: u64,
}

impl LedgerDocument {
    fn into_state(self, initial_cash: f64) -> AccountState {
        let cash = self.cash.unwrap_or(initial_cash);
        AccountState {
            cash,
            equity: self.equity.unwrap_or(cash),
            positions: self.positions,
            open_orders: self.open_orders,
            history: self.history,
            last_mark_at: self.last_mark,
            last_prices: self.last_prices,
            order_seq: self.order_seq,
        }
    }
}

/// Owns the ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Load the persisted state, or a fresh one at `initial_cash`.
    pub fn load(&self, initial_cash: f64) -> Result<AccountState, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no ledger on disk, starting fresh");
                return Ok(AccountState::new(initial_cash));
            }
            Err(e) => return Err(self.io_err(e)),
        };

        if content.trim().is_empty() {
            tracing::warn!(path = %self.path.display(), "empty ledger file, starting fresh");
            return Ok(AccountState::new(initial_cash));
        }

        let corrupt = |source| LedgerError::Corrupt {
            path: self.path.clone(),
            source,
        };
        let value: serde_json::Value = serde_json::from_str(&content).map_err(corrupt)?;
        if !value.is_object() {
            return Err(corrupt(serde::de::Error::custom(
                "ledger root must be a JSON object",
            )));
        }
        let doc: LedgerDocument = serde_json::from_value(value).map_err(corrupt)?;
        let state = doc.into_state(initial_cash);
        tracing::debug!(
            path = %self.path.display(),
            positions = state.positions.len(),
            open_orders = state.open_orders.len(),
            history = state.history.len(),
            "ledger loaded"
        );
        Ok(state)
    }

    /// Persist the full state atomically.
    pub fn save(&self, state: &AccountState) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let tmp_path = self.tmp_path();
        let write_tmp = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()
        };
        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.io_err(e));
        }

        // Atomic rename
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            self.io_err(e)
        })?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "ledger saved");
        Ok(())
    }

    /// Replace any persisted state with a fresh one at `initial_cash`.
    ///
    /// The prior file is only replaced by the final rename, so a failed reset
    /// leaves it intact.
    pub fn reset(&self, initial_cash: f64) -> Result<AccountState, LedgerError> {
        let state = AccountState::new(initial_cash);
        self.save(&state)?;
        tracing::info!(path = %self.path.display(), initial_cash, "ledger reset");
        Ok(state)
    }
}
