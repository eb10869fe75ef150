//! AccountState: the whole ledger, persisted as a single document.

use super::ids::OrderId;
use super::order::Order;
use super::position::Position;
use super::trade::TradeRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate account state: cash, marked equity, positions, pending orders,
/// and the trade history.
///
/// Positions are keyed by instrument in a `BTreeMap` so the persisted
/// document is byte-stable for identical states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub cash: f64,
    pub equity: f64,
    pub positions: BTreeMap<String, Position>,
    pub open_orders: Vec<Order>,
    pub history: Vec<TradeRecord>,
    #[serde(rename = "last_mark")]
    pub last_mark_at: Option<DateTime<Utc>>,
    /// Last close seen per instrument.
    #[serde(default)]
    pub last_prices: BTreeMap<String, f64>,
    /// Highest order number issued so far.
    #[serde(default)]
    pub order_seq: u64,
}

impl AccountState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            equity: initial_cash,
            positions: BTreeMap::new(),
            open_orders: Vec::new(),
            history: Vec::new(),
            last_mark_at: None,
            last_prices: BTreeMap::new(),
            order_seq: 0,
        }
    }

    /// Reserve the next order id.
    ///
    /// The number is `len(history) + len(open_orders) + 1`, raised above every
    /// id issued before so cancellations never cause reuse.
    pub fn next_order_id(&mut self) -> OrderId {
        let derived = (self.history.len() + self.open_orders.len()) as u64 + 1;
        let seq = derived.max(self.order_seq + 1);
        self.order_seq = seq;
        OrderId::paper(seq)
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.history.iter().filter(|t| t.is_open())
    }

    pub fn trade_for_order(&self, order_id: &OrderId) -> Option<&TradeRecord> {
        self.history.iter().find(|t| &t.order_id == order_id)
    }

    /// Sum of realized PnL over closed trades.
    pub fn realized_pnl(&self) -> f64 {
        self.history.iter().filter_map(|t| t.pnl).sum()
    }

    /// Unrealized PnL of all positions; instruments without a price are
    /// marked at their average price (zero contribution).
    pub fn unrealized_pnl(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.instrument).copied().unwrap_or(pos.avg_price);
                pos.unrealized_pnl(price)
            })
            .sum()
    }

    /// Net units of open trades on `instrument`.
    pub fn open_trade_units(&self, instrument: &str) -> i64 {
        self.open_trades()
            .filter(|t| t.instrument == instrument)
            .fold(0i64, |acc, t| acc.saturating_add(t.signed_units))
    }
}
