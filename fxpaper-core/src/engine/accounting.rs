//! Position accounting: applies fills to the position map, opens trade
//! records, and marks equity.
//!
//! Netting model: every fill on an instrument blends into one signed position
//! with a units-weighted average price. Individual fills stay visible only as
//! trade records, one per fill.

use crate::config::MarkPolicy;
use crate::domain::{AccountState, Order, Position, TradeRecord, TradeStatus};
use chrono::{DateTime, Utc};

/// Apply a fill: charge commission, net into the position, open a trade record.
pub fn apply_fill(
    state: &mut AccountState,
    order: &Order,
    fill_price: f64,
    commission: f64,
    at: DateTime<Utc>,
) {
    state.cash -= commission;

    match state.positions.get_mut(&order.instrument) {
        None => {
            state.positions.insert(
                order.instrument.clone(),
                Position::new(order.instrument.clone(), order.signed_units, fill_price),
            );
        }
        Some(pos) => {
            let new_units = pos.signed_units.saturating_add(order.signed_units);
            if new_units == 0 {
                state.positions.remove(&order.instrument);
            } else {
                pos.avg_price = (pos.avg_price * pos.signed_units as f64
                    + fill_price * order.signed_units as f64)
                    / new_units as f64;
                pos.signed_units = new_units;
            }
        }
    }

    state.history.push(TradeRecord {
        order_id: order.id.clone(),
        instrument: order.instrument.clone(),
        side: order.side,
        signed_units: order.signed_units,
        open_price: fill_price,
        stop_loss: order.stop_loss,
        take_profit: order.take_profit,
        status: TradeStatus::Open,
        opened_at: at,
        close_price: None,
        closed_at: None,
        pnl: None,
        close_reason: None,
    });
}

/// Recompute the position on `instrument` from the trade records still open.
///
/// Used after a close. With a single open trade this removes the position;
/// with several it removes only the closed lot, keeping the position equal to
/// the sum of open trades.
///
/// The average price here weighs every open record, including offsetting
/// pairs that `apply_fill` already netted to flat. After a close the average
/// can therefore differ from the running netted average; units always agree.
pub fn rebuild_position(state: &mut AccountState, instrument: &str) {
    let (units, weighted) = state
        .open_trades()
        .filter(|t| t.instrument == instrument)
        .fold((0i64, 0.0f64), |(units, weighted), t| {
            (
                units.saturating_add(t.signed_units),
                weighted + t.open_price * t.signed_units as f64,
            )
        });

    if units == 0 {
        state.positions.remove(instrument);
    } else {
        state.positions.insert(
            instrument.to_string(),
            Position::new(instrument, units, weighted / units as f64),
        );
    }
}

/// Mark equity after a bar on `instrument` closed at `close`.
///
/// `BarClose` prices every position at `close`, whatever its instrument.
/// `LastPrice` uses each instrument's last recorded close, falling back to
/// the position's average price.
pub fn mark(
    state: &mut AccountState,
    instrument: &str,
    close: f64,
    policy: MarkPolicy,
    at: DateTime<Utc>,
) {
    state.last_prices.insert(instrument.to_string(), close);

    let position_value: f64 = state
        .positions
        .values()
        .map(|pos| {
            let price = match policy {
                MarkPolicy::BarClose => close,
                MarkPolicy::LastPrice => state
                    .last_prices
                    .get(&pos.instrument)
                    .copied()
                    .unwrap_or(pos.avg_price),
            };
            pos.market_value(price)
        })
        .sum();

    state.equity = state.cash + position_value;
    state.last_mark_at = Some(at);
}
