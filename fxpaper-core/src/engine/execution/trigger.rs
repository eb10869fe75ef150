//! Trigger checking: does a bar fill a given pending order, and at what price?

use super::cost_model::CostModel;
use crate::domain::{EntryType, Instrument, Order, PriceBar};

/// Result of checking a pending order against a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerResult {
    /// Order stays pending, unchanged.
    NoTrigger,
    /// Order fills in full at `fill_price`.
    Fill { fill_price: f64 },
}

/// Check whether `order` fills on `bar`.
///
/// The caller is responsible for only passing orders on the bar's instrument.
pub fn check_trigger(
    order: &Order,
    bar: &PriceBar,
    instrument: &Instrument,
    cost: &CostModel,
) -> TriggerResult {
    match order.entry_type {
        EntryType::Market => TriggerResult::Fill {
            fill_price: cost.market_fill_price(bar.close, order.is_buy(), instrument),
        },
        EntryType::Limit => match order.limit_price {
            Some(limit) => check_limit(order.is_buy(), limit, bar),
            // Unreachable for validated orders; a hand-edited ledger may have it.
            None => TriggerResult::NoTrigger,
        },
    }
}

/// Buy limit: fills if `low <= limit`. Sell limit: fills if `high >= limit`.
/// Always at exactly the limit, with no slippage.
fn check_limit(is_buy: bool, limit: f64, bar: &PriceBar) -> TriggerResult {
    let traded_through = if is_buy {
        bar.low <= limit
    } else {
        bar.high >= limit
    };
    if traded_through {
        TriggerResult::Fill { fill_price: limit }
    } else {
        TriggerResult::NoTrigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderRequest};
    use chrono::Utc;

    fn order(req: OrderRequest) -> Order {
        req.into_order(OrderId::paper(1), Utc::now()).unwrap()
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar::new("EUR_USD", open, high, low, close)
    }

    fn eur_usd() -> Instrument {
        Instrument::fx_convention("EUR_USD")
    }

    #[test]
    fn market_always_fills() {
        let o = order(OrderRequest::market("EUR_USD", "buy", 1000));
        let result = check_trigger(&o, &bar(1.1, 1.2, 1.0, 1.15), &eur_usd(), &CostModel::frictionless());
        assert_eq!(result, TriggerResult::Fill { fill_price: 1.15 });
    }

    #[test]
    fn buy_limit_waits_above_low() {
        let o = order(OrderRequest::limit("EUR_USD", "buy", 1000, 1.0950));
        let cost = CostModel::new(0.8, 0.2, 0.0);
        let result = check_trigger(&o, &bar(1.10, 1.11, 1.0951, 1.10), &eur_usd(), &cost);
        assert_eq!(result, TriggerResult::NoTrigger);
    }

    #[test]
    fn buy_limit_fills_at_limit_when_touched() {
        let o = order(OrderRequest::limit("EUR_USD", "buy", 1000, 1.0950));
        let cost = CostModel::new(0.8, 0.2, 0.0);
        let touched = check_trigger(&o, &bar(1.10, 1.11, 1.0950, 1.10), &eur_usd(), &cost);
        assert_eq!(touched, TriggerResult::Fill { fill_price: 1.0950 });
        // Gap below the limit still fills at the limit
        let gapped = check_trigger(&o, &bar(1.08, 1.09, 1.07, 1.08), &eur_usd(), &cost);
        assert_eq!(gapped, TriggerResult::Fill { fill_price: 1.0950 });
    }

    #[test]
    fn sell_limit_fills_when_high_reaches() {
        let o = order(OrderRequest::limit("EUR_USD", "sell", 1000, 1.1100));
        let cost = CostModel::frictionless();
        assert_eq!(
            check_trigger(&o, &bar(1.10, 1.1099, 1.09, 1.10), &eur_usd(), &cost),
            TriggerResult::NoTrigger
        );
        assert_eq!(
            check_trigger(&o, &bar(1.10, 1.1100, 1.09, 1.10), &eur_usd(), &cost),
            TriggerResult::Fill { fill_price: 1.1100 }
        );
    }
}
