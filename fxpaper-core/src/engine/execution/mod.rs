//! Order matching: decides which pending orders fill on a bar and at what price.
//!
//! The execution engine is stateless: it carries only the cost model. It
//! borrows the pending order list, removes the orders that fill, and hands
//! back `Fill` records for position accounting to apply.

pub mod cost_model;
pub mod trigger;

pub use cost_model::CostModel;

use crate::domain::{Instrument, Order, OrderStatus, PriceBar};

use self::trigger::{check_trigger, TriggerResult};

/// A filled order and its price. The order carries status `Filled`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order: Order,
    pub price: f64,
}

/// Matches pending orders against bars.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    cost: CostModel,
}

impl ExecutionEngine {
    pub fn new(cost: CostModel) -> Self {
        Self { cost }
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Fill every pending order on `bar.instrument` that the bar triggers.
    ///
    /// Filled orders are removed from `open_orders` and returned in placement
    /// order. Untriggered orders and orders on other instruments stay, in
    /// their original relative order.
    pub fn match_orders(
        &self,
        open_orders: &mut Vec<Order>,
        bar: &PriceBar,
        instrument: &Instrument,
    ) -> Vec<Fill> {
        let mut fills = Vec::new();
        let mut remaining = Vec::with_capacity(open_orders.len());

        for mut order in open_orders.drain(..) {
            if order.instrument != bar.instrument || order.status != OrderStatus::Pending {
                remaining.push(order);
                continue;
            }
            match check_trigger(&order, bar, instrument, &self.cost) {
                TriggerResult::Fill { fill_price } => {
                    order.status = OrderStatus::Filled;
                    fills.push(Fill {
                        order,
                        price: fill_price,
                    });
                }
                TriggerResult::NoTrigger => remaining.push(order),
            }
        }

        *open_orders = remaining;
        fills
    }
}
