//! Property tests for broker invariants.
//!
//! Uses proptest to verify:
//! 1. Order ids strictly increase, whatever mix of places and cancels
//! 2. Limit orders fill exactly at their price, and only when touched
//! 3. Position units always equal the sum of open trade units

use chrono::Utc;
use fxpaper_core::domain::{AccountState, OrderId, OrderRequest, PriceBar};
use fxpaper_core::engine::PaperEngine;
use fxpaper_core::PaperConfig;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.8..1.6_f64).prop_map(|p| (p * 100_000.0).round() / 100_000.0)
}

fn arb_units() -> impl Strategy<Value = i64> {
    (1..10_000_i64).prop_map(|u| u * 100)
}

fn arb_side() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("buy"), Just("sell")]
}

/// A well-formed bar around `mid`.
fn arb_bar() -> impl Strategy<Value = PriceBar> {
    (arb_price(), 0.0..0.02_f64, 0.0..0.02_f64, 0.0..1.0_f64).prop_map(|(mid, up, down, t)| {
        let high = mid + up;
        let low = mid - down;
        let close = low + (high - low) * t;
        PriceBar::new("EUR_USD", mid, high, low, close)
    })
}

#[derive(Debug, Clone)]
enum Action {
    Place { side: &'static str, units: i64, limit: Option<f64>, sl_gap: Option<f64> },
    Cancel(usize),
    Bar(PriceBar),
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (arb_side(), arb_units(), proptest::option::of(arb_price()), proptest::option::of(0.001..0.02_f64))
            .prop_map(|(side, units, limit, sl_gap)| Action::Place { side, units, limit, sl_gap }),
        (0..8_usize).prop_map(Action::Cancel),
        arb_bar().prop_map(Action::Bar),
    ]
}

fn engine() -> PaperEngine {
    PaperEngine::from_config(&PaperConfig::default())
}

fn place(state: &mut AccountState, side: &str, units: i64, limit: Option<f64>, sl_gap: Option<f64>) -> OrderId {
    let req = match limit {
        Some(px) => OrderRequest::limit("EUR_USD", side, units, px),
        None => OrderRequest::market("EUR_USD", side, units),
    };
    // Stop placed on the losing side of the reference price
    let reference = limit.unwrap_or(1.2);
    let stop = sl_gap.map(|gap| if side == "buy" { reference - gap } else { reference + gap });
    let id = state.next_order_id();
    let order = req.with_stops(stop, None).into_order(id.clone(), Utc::now()).unwrap();
    state.open_orders.push(order);
    id
}

// ── 1. Id monotonicity ───────────────────────────────────────────────

proptest! {
    #[test]
    fn ids_strictly_increase(actions in prop::collection::vec(arb_action(), 1..60)) {
        let engine = engine();
        let mut state = AccountState::new(100_000.0);
        let mut last_seq = 0u64;

        for action in actions {
            match action {
                Action::Place { side, units, limit, sl_gap } => {
                    let id = place(&mut state, side, units, limit, sl_gap);
                    let seq = id.seq().unwrap();
                    prop_assert!(seq > last_seq, "id {} not above {}", seq, last_seq);
                    last_seq = seq;
                }
                Action::Cancel(i) => {
                    if i < state.open_orders.len() {
                        state.open_orders.remove(i);
                    }
                }
                Action::Bar(bar) => {
                    engine.process_bar(&mut state, &bar, Utc::now()).unwrap();
                }
            }
        }
    }
}

// ── 2. Limit boundaries ──────────────────────────────────────────────

proptest! {
    /// A buy limit fills at exactly its price iff the low reaches it.
    #[test]
    fn buy_limit_boundary(limit in arb_price(), bar in arb_bar()) {
        let mut state = AccountState::new(100_000.0);
        place(&mut state, "buy", 1000, Some(limit), None);
        let report = engine().process_bar(&mut state, &bar, Utc::now()).unwrap();

        if bar.low <= limit {
            prop_assert_eq!(report.fills.len(), 1);
            prop_assert_eq!(report.fills[0].fill_price, limit);
        } else {
            prop_assert!(report.fills.is_empty());
            prop_assert_eq!(state.open_orders.len(), 1);
        }
    }

    /// A sell limit fills at exactly its price iff the high reaches it.
    #[test]
    fn sell_limit_boundary(limit in arb_price(), bar in arb_bar()) {
        let mut state = AccountState::new(100_000.0);
        place(&mut state, "sell", 1000, Some(limit), None);
        let report = engine().process_bar(&mut state, &bar, Utc::now()).unwrap();

        if bar.high >= limit {
            prop_assert_eq!(report.fills.len(), 1);
            prop_assert_eq!(report.fills[0].fill_price, limit);
        } else {
            prop_assert!(report.fills.is_empty());
        }
    }
}

// ── 3. Position / open trade consistency ─────────────────────────────

proptest! {
    /// After every action, the position on an instrument carries exactly the
    /// units of its open trades, and is absent when they net to zero.
    #[test]
    fn position_matches_open_trades(actions in prop::collection::vec(arb_action(), 1..80)) {
        let engine = engine();
        let mut state = AccountState::new(100_000.0);

        for action in actions {
            match action {
                Action::Place { side, units, limit, sl_gap } => {
                    place(&mut state, side, units, limit, sl_gap);
                }
                Action::Cancel(i) => {
                    if i < state.open_orders.len() {
                        state.open_orders.remove(i);
                    }
                }
                Action::Bar(bar) => {
                    engine.process_bar(&mut state, &bar, Utc::now()).unwrap();
                }
            }

            let open_units = state.open_trade_units("EUR_USD");
            match state.position("EUR_USD") {
                Some(pos) => {
                    prop_assert_eq!(pos.signed_units, open_units);
                    prop_assert!(pos.signed_units != 0);
                }
                None => prop_assert_eq!(open_units, 0),
            }
        }
    }
}
