//! Instrument metadata: pip size, lot size, quote currency.
//!
//! The matching engine only needs the pip size (to turn spread and slippage
//! expressed in pips into price offsets). Metadata comes from configuration;
//! instruments that are not configured fall back to the usual FX convention.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pip size for JPY-quoted pairs.
pub const JPY_PIP: f64 = 0.01;
/// Pip size for every other pair.
pub const STANDARD_PIP: f64 = 0.0001;
/// Default lot size when an instrument is not configured.
pub const DEFAULT_LOT_SIZE: u64 = 1000;

/// Metadata for one tradable instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub pip_size: f64,
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
    #[serde(default)]
    pub quote_currency: String,
}

fn default_lot_size() -> u64 {
    DEFAULT_LOT_SIZE
}

impl Instrument {
    pub fn new(pip_size: f64, lot_size: u64, quote_currency: impl Into<String>) -> Self {
        Self {
            pip_size,
            lot_size,
            quote_currency: quote_currency.into(),
        }
    }

    /// Conventional metadata for an unconfigured `BASE_QUOTE` name.
    ///
    /// The quote currency is whatever follows the last `_` or `/` (or the last
    /// three characters of a bare `EURUSD`-style name).
    pub fn fx_convention(name: &str) -> Self {
        let quote = quote_currency_of(name);
        let pip_size = if quote.eq_ignore_ascii_case("JPY") {
            JPY_PIP
        } else {
            STANDARD_PIP
        };
        Self::new(pip_size, DEFAULT_LOT_SIZE, quote.to_ascii_uppercase())
    }

    /// Price offset for a distance expressed in pips.
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    /// Units for a number of lots.
    pub fn lots_to_units(&self, lots: u64) -> u64 {
        lots.saturating_mul(self.lot_size)
    }
}

fn quote_currency_of(name: &str) -> &str {
    if let Some(idx) = name.rfind(['_', '/']) {
        return &name[idx + 1..];
    }
    if name.len() >= 6 && name.is_char_boundary(name.len() - 3) {
        return &name[name.len() - 3..];
    }
    name
}

/// Configured instrument metadata, keyed by instrument name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct InstrumentTable {
    entries: BTreeMap<String, Instrument>,
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, instrument: Instrument) {
        self.entries.insert(name.into(), instrument);
    }

    /// Configured metadata for `name`, or the FX convention if not configured.
    pub fn resolve(&self, name: &str) -> Instrument {
        self.entries
            .get(name)
            .cloned()
            .unwrap_or_else(|| Instrument::fx_convention(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Instrument)> {
        self.entries.iter()
    }
}
