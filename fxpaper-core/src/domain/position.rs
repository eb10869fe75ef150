use serde::{Deserialize, Serialize};

/// Net position for one instrument (netting model, not independent lots).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    /// Positive = long, negative = short. Never zero while stored.
    pub signed_units: i64,
    pub avg_price: f64,
}

impl Position {
    pub fn new(instrument: impl Into<String>, signed_units: i64, avg_price: f64) -> Self {
        Self {
            instrument: instrument.into(),
            signed_units,
            avg_price,
        }
    }

    pub fn is_long(&self) -> bool {
        self.signed_units > 0
    }

    pub fn is_short(&self) -> bool {
        self.signed_units < 0
    }

    /// Signed units times price, the quantity equity is marked with.
    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_units as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.signed_units as f64 * (price - self.avg_price)
    }
}
