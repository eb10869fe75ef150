//! Order types: the raw request handed in by the decision source, the
//! validated pending order, and the accept/reject response.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest order size accepted, in units. Keeps position and trade sums far
/// from `i64` overflow.
pub const MAX_ORDER_UNITS: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }

    /// Side implied by a signed unit count (zero reads as buy).
    pub fn from_signed_units(units: i64) -> Self {
        if units < 0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }
}

impl FromStr for OrderSide {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(RejectReason::InvalidSide),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Fill on the next bar's close, plus half spread and slippage.
    Market,
    /// Fill at the limit price once a bar trades through it.
    Limit,
}

impl FromStr for EntryType {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(EntryType::Market),
            "limit" => Ok(EntryType::Limit),
            _ => Err(RejectReason::InvalidEntryType),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Market => write!(f, "market"),
            EntryType::Limit => write!(f, "limit"),
        }
    }
}

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
}

/// An order as proposed by the decision source.
///
/// `side` and `entry_type` stay free-form strings: an unrecognized value is a
/// rejection the caller should see, not a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: String,
    /// Unsigned size; the sign is derived from `side`. A negative value is
    /// read by magnitude.
    pub units: i64,
    pub entry_type: String,
    /// Limit price. Ignored for market orders.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

impl OrderRequest {
    pub fn market(instrument: impl Into<String>, side: &str, units: i64) -> Self {
        Self {
            instrument: instrument.into(),
            side: side.to_string(),
            units,
            entry_type: "market".to_string(),
            price: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn limit(instrument: impl Into<String>, side: &str, units: i64, price: f64) -> Self {
        Self {
            entry_type: "limit".to_string(),
            price: Some(price),
            ..Self::market(instrument, side, units)
        }
    }

    pub fn with_stops(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Validate and turn into a pending order under `id`.
    ///
    /// Checks run in a fixed order (side, entry type, units, prices) so a
    /// request with several problems always reports the same reason.
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Result<Order, RejectReason> {
        let side: OrderSide = self.side.parse()?;
        let entry_type: EntryType = self.entry_type.parse()?;

        let units = self.units.unsigned_abs();
        if units == 0 || units > MAX_ORDER_UNITS.unsigned_abs() {
            return Err(RejectReason::InvalidUnits);
        }
        let signed_units = units as i64 * side.sign();

        let limit_price = match entry_type {
            EntryType::Market => None,
            EntryType::Limit => Some(self.price.ok_or(RejectReason::MissingLimitPrice)?),
        };
        for price in [limit_price, self.stop_loss, self.take_profit].into_iter().flatten() {
            if !price.is_finite() || price <= 0.0 {
                return Err(RejectReason::InvalidPrice);
            }
        }

        Ok(Order {
            id,
            instrument: self.instrument,
            side,
            signed_units,
            entry_type,
            limit_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            status: OrderStatus::Pending,
            created_at,
        })
    }
}

/// A validated order in the pending book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument: String,
    pub side: OrderSide,
    /// Positive for buys, negative for sells.
    pub signed_units: i64,
    pub entry_type: EntryType,
    /// Present iff `entry_type` is `Limit`.
    pub limit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_buy(&self) -> bool {
        self.signed_units > 0
    }

    pub fn abs_units(&self) -> u64 {
        self.signed_units.unsigned_abs()
    }
}

/// Why an order request was refused. No state changes on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidSide,
    InvalidEntryType,
    InvalidUnits,
    MissingLimitPrice,
    InvalidPrice,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidSide => "invalid_side",
            RejectReason::InvalidEntryType => "invalid_entry_type",
            RejectReason::InvalidUnits => "invalid_units",
            RejectReason::MissingLimitPrice => "missing_limit_price",
            RejectReason::InvalidPrice => "invalid_price",
        };
        f.write_str(s)
    }
}

/// Outcome of `place_order`, serialized as
/// `{"status": "accepted", "order_id": ...}` or `{"status": "error", "reason": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaceOrderResponse {
    Accepted { order_id: OrderId },
    #[serde(rename = "error")]
    Rejected { reason: RejectReason },
}

impl PlaceOrderResponse {
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            PlaceOrderResponse::Accepted { order_id } => Some(order_id),
            PlaceOrderResponse::Rejected { .. } => None,
        }
    }
}
