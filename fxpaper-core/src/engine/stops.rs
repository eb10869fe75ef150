//! Stop engine: stop-loss / take-profit checks against a bar's range.
//!
//! When both levels lie inside the same bar there is no way to tell which was
//! touched first, so the stop-loss wins.

use super::accounting::rebuild_position;
use crate::domain::{AccountState, CloseReason, PriceBar, TradeRecord};
use chrono::{DateTime, Utc};

/// Which level, if any, the bar hits for `trade`, with the close price.
///
/// Long: SL if `low <= stop_loss`, else TP if `high >= take_profit`.
/// Short: SL if `high >= stop_loss`, else TP if `low <= take_profit`.
pub fn check_stops(trade: &TradeRecord, bar: &PriceBar) -> Option<(f64, CloseReason)> {
    if trade.is_long() {
        if let Some(sl) = trade.stop_loss.filter(|&sl| bar.low <= sl) {
            return Some((sl, CloseReason::StopLoss));
        }
        if let Some(tp) = trade.take_profit.filter(|&tp| bar.high >= tp) {
            return Some((tp, CloseReason::TakeProfit));
        }
    } else {
        if let Some(sl) = trade.stop_loss.filter(|&sl| bar.high >= sl) {
            return Some((sl, CloseReason::StopLoss));
        }
        if let Some(tp) = trade.take_profit.filter(|&tp| bar.low <= tp) {
            return Some((tp, CloseReason::TakeProfit));
        }
    }
    None
}

/// Close the trade at `index` in the history, realize its PnL into cash and
/// drop its units from the position.
///
/// Returns the realized PnL, or `None` if the trade was not open.
pub fn close_trade(
    state: &mut AccountState,
    index: usize,
    price: f64,
    reason: CloseReason,
    at: DateTime<Utc>,
) -> Option<f64> {
    let trade = state.history.get_mut(index)?;
    let pnl = trade.close(price, reason, at)?;
    let instrument = trade.instrument.clone();
    state.cash += pnl;
    rebuild_position(state, &instrument);
    Some(pnl)
}

/// Evaluate every open trade on the bar's instrument and close the triggered
/// ones. Each trade is checked once, so it closes at most once per bar.
///
/// Returns the closed records.
pub fn process_stops(state: &mut AccountState, bar: &PriceBar, at: DateTime<Utc>) -> Vec<TradeRecord> {
    let triggered: Vec<(usize, f64, CloseReason)> = state
        .history
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_open() && t.instrument == bar.instrument)
        .filter_map(|(i, t)| check_stops(t, bar).map(|(px, reason)| (i, px, reason)))
        .collect();

    let mut closed = Vec::with_capacity(triggered.len());
    for (index, price, reason) in triggered {
        if close_trade(state, index, price, reason, at).is_some() {
            closed.push(state.history[index].clone());
        }
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderSide, TradeStatus};

    fn trade(units: i64, sl: Option<f64>, tp: Option<f64>) -> TradeRecord {
        TradeRecord {
            order_id: OrderId::paper(1),
            instrument: "EUR_USD".into(),
            side: OrderSide::from_signed_units(units),
            signed_units: units,
            open_price: 1.10,
            stop_loss: sl,
            take_profit: tp,
            status: TradeStatus::Open,
            opened_at: Utc::now(),
            close_price: None,
            closed_at: None,
            pnl: None,
            close_reason: None,
        }
    }

    fn bar(high: f64, low: f64) -> PriceBar {
        PriceBar::new("EUR_USD", (high + low) / 2.0, high, low, (high + low) / 2.0)
    }

    #[test]
    fn long_stop_loss() {
        let t = trade(1000, Some(1.09), Some(1.12));
        assert_eq!(check_stops(&t, &bar(1.10, 1.09)), Some((1.09, CloseReason::StopLoss)));
        assert_eq!(check_stops(&t, &bar(1.11, 1.0901)), None);
    }

    #[test]
    fn long_take_profit() {
        let t = trade(1000, Some(1.09), Some(1.12));
        assert_eq!(check_stops(&t, &bar(1.125, 1.10)), Some((1.12, CloseReason::TakeProfit)));
    }

    #[test]
    fn short_levels_are_mirrored() {
        let t = trade(-1000, Some(1.11), Some(1.08));
        assert_eq!(check_stops(&t, &bar(1.11, 1.10)), Some((1.11, CloseReason::StopLoss)));
        assert_eq!(check_stops(&t, &bar(1.10, 1.08)), Some((1.08, CloseReason::TakeProfit)));
        assert_eq!(check_stops(&t, &bar(1.1099, 1.0801)), None);
    }

    #[test]
    fn stop_loss_wins_when_both_in_range() {
        let long = trade(1000, Some(1.09), Some(1.12));
        assert_eq!(check_stops(&long, &bar(1.13, 1.08)).unwrap().1, CloseReason::StopLoss);
        let short = trade(-1000, Some(1.11), Some(1.08));
        assert_eq!(check_stops(&short, &bar(1.12, 1.07)).unwrap().1, CloseReason::StopLoss);
    }

    #[test]
    fn no_levels_never_trigger() {
        let t = trade(1000, None, None);
        assert_eq!(check_stops(&t, &bar(2.0, 0.5)), None);
    }

    #[test]
    fn process_closes_and_realizes() {
        let mut state = AccountState::new(100_000.0);
        state.history.push(trade(1000, Some(1.09), None));
        state
            .positions
            .insert("EUR_USD".into(), crate::domain::Position::new("EUR_USD", 1000, 1.10));

        let closed = process_stops(&mut state, &bar(1.10, 1.08), Utc::now());
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_reason, Some(CloseReason::StopLoss));
        assert!((state.cash - (100_000.0 - 10.0)).abs() < 1e-9);
        assert!(state.positions.is_empty());

        // Same bar again: nothing left to close
        assert!(process_stops(&mut state, &bar(1.10, 1.08), Utc::now()).is_empty());
    }

    #[test]
    fn other_instruments_ignored() {
        let mut state = AccountState::new(100_000.0);
        let mut t = trade(1000, Some(1.09), None);
        t.instrument = "GBP_USD".into();
        state.history.push(t);
        assert!(process_stops(&mut state, &bar(1.10, 1.00), Utc::now()).is_empty());
        assert!(state.history[0].is_open());
    }
}
