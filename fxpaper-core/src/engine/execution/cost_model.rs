//! Cost model: spread, slippage and commission.
//!
//! Spread and slippage are expressed in pips and converted to price with the
//! instrument's pip size. Both are directional: buyers pay more, sellers
//! receive less. Commission is charged per million of notional.

use crate::config::PaperConfig;
use crate::domain::Instrument;

/// Execution friction applied to fills.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Full bid/ask spread in pips.
    pub spread_pips: f64,
    /// Adverse slippage on market fills, in pips.
    pub slippage_pips: f64,
    /// Commission per 1,000,000 of notional.
    pub commission_per_million: f64,
}

impl CostModel {
    pub fn new(spread_pips: f64, slippage_pips: f64, commission_per_million: f64) -> Self {
        Self {
            spread_pips,
            slippage_pips,
            commission_per_million,
        }
    }

    pub fn from_config(config: &PaperConfig) -> Self {
        Self::new(
            config.spread_pips,
            config.slippage_pips,
            config.commission_per_million,
        )
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// `(bid, ask)` around a mid price, half the spread on each side.
    pub fn bid_ask(&self, mid: f64, instrument: &Instrument) -> (f64, f64) {
        let half = instrument.pips_to_price(self.spread_pips) / 2.0;
        (mid - half, mid + half)
    }

    /// Market fill price at a bar close.
    ///
    /// Buys lift the ask, sells hit the bid, then slippage moves the price
    /// further against the trader.
    pub fn market_fill_price(&self, close: f64, is_buy: bool, instrument: &Instrument) -> f64 {
        let (bid, ask) = self.bid_ask(close, instrument);
        let slip = instrument.pips_to_price(self.slippage_pips);
        if is_buy {
            ask + slip
        } else {
            bid - slip
        }
    }

    /// `commission = commission_per_million * |units| * price / 1_000_000`
    pub fn commission(&self, units: u64, price: f64) -> f64 {
        self.commission_per_million * (units as f64 * price / 1_000_000.0)
    }
}
