//! TradeRecord: one history entry per fill, closed at most once.

use super::ids::OrderId;
use super::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    /// Closed by an explicit `close_trade` call.
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::StopLoss => write!(f, "stop_loss"),
            CloseReason::TakeProfit => write!(f, "take_profit"),
            CloseReason::Manual => write!(f, "manual"),
        }
    }
}

/// A fill and, once closed, its exit.
///
/// Everything except the closing fields is fixed at creation. The closing
/// fields are written together by [`TradeRecord::close`], which refuses to run
/// twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub order_id: OrderId,
    pub instrument: String,
    pub side: OrderSide,
    pub signed_units: i64,

    // ── Entry ──
    pub open_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,

    // ── Exit ──
    #[serde(default)]
    pub close_price: Option<f64>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub close_reason: Option<CloseReason>,
}

impl TradeRecord {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_long(&self) -> bool {
        self.signed_units > 0
    }

    /// PnL if the trade were closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        self.signed_units as f64 * (price - self.open_price)
    }

    /// Close at `price`, returning the realized PnL.
    ///
    /// Returns `None` and leaves the record untouched if it is already closed.
    pub fn close(&mut self, price: f64, reason: CloseReason, at: DateTime<Utc>) -> Option<f64> {
        if !self.is_open() {
            return None;
        }
        let pnl = self.pnl_at(price);
        self.status = TradeStatus::Closed;
        self.close_price = Some(price);
        self.closed_at = Some(at);
        self.pnl = Some(pnl);
        self.close_reason = Some(reason);
        Some(pnl)
    }
}
