//! PriceBar: one closed OHLC candle for an instrument.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar for a single instrument.
///
/// The broker carries no notion of timeframe; the driver decides what a bar is
/// and delivers each closed candle exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub instrument: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(instrument: impl Into<String>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            instrument: instrument.into(),
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Reject bars the matching and stop engines cannot reason about.
    ///
    /// Only the range is checked (`high >= low`); open/close outside the range
    /// are tolerated because some feeds report them that way on thin candles.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.is_void() {
            return Err(BarError::NonFinite {
                instrument: self.instrument.clone(),
            });
        }
        if self.high < self.low {
            return Err(BarError::InvertedRange {
                instrument: self.instrument.clone(),
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar for {instrument} has a non-finite price")]
    NonFinite { instrument: String },

    #[error("bar for {instrument} has high {high} below low {low}")]
    InvertedRange {
        instrument: String,
        high: f64,
        low: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar::new("EUR_USD", 1.1000, 1.1050, 1.0980, 1.1020)
    }

    #[test]
    fn sane_bar_validates() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(matches!(bar.validate(), Err(BarError::NonFinite { .. })));
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 1.0900; // below low
        assert!(matches!(
            bar.validate(),
            Err(BarError::InvertedRange { .. })
        ));
    }

    #[test]
    fn doji_bar_is_valid() {
        let bar = PriceBar::new("EUR_USD", 1.1, 1.1, 1.1, 1.1);
        assert!(bar.validate().is_ok());
    }
}
