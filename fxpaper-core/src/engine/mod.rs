//! Bar engine: applies one bar's price action to an account state.
//!
//! Each bar runs four phases, scoped to the bar's instrument:
//!
//! 1. Matching: pending orders that the bar triggers fill
//! 2. Accounting: fills net into positions and open trade records
//! 3. Stops: open trades whose SL/TP lies inside the bar close
//! 4. Mark-to-market: equity recomputed from cash and positions
//!
//! The engine is pure over `AccountState`; persistence and locking belong to
//! the broker.

pub mod accounting;
pub mod execution;
pub mod stops;

pub use execution::{CostModel, ExecutionEngine, Fill};

use crate::config::{MarkPolicy, PaperConfig};
use crate::domain::{AccountState, BarError, InstrumentTable, PriceBar, TradeRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One fill produced by a bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub order: crate::domain::Order,
    pub fill_price: f64,
    pub commission: f64,
}

/// What a bar did to the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarReport {
    pub instrument: String,
    pub fills: Vec<FillReport>,
    pub closed: Vec<TradeRecord>,
    pub cash: f64,
    pub equity: f64,
}

/// Runs the per-bar phases with a fixed configuration.
#[derive(Debug, Clone)]
pub struct PaperEngine {
    execution: ExecutionEngine,
    instruments: InstrumentTable,
    mark_policy: MarkPolicy,
}

impl PaperEngine {
    pub fn new(cost: CostModel, instruments: InstrumentTable, mark_policy: MarkPolicy) -> Self {
        Self {
            execution: ExecutionEngine::new(cost),
            instruments,
            mark_policy,
        }
    }

    pub fn from_config(config: &PaperConfig) -> Self {
        Self::new(
            CostModel::from_config(config),
            config.instruments.clone(),
            config.mark_policy,
        )
    }

    pub fn cost_model(&self) -> &CostModel {
        self.execution.cost_model()
    }

    /// Apply `bar` to `state`. On a bar error `state` is untouched.
    pub fn process_bar(
        &self,
        state: &mut AccountState,
        bar: &PriceBar,
        at: DateTime<Utc>,
    ) -> Result<BarReport, BarError> {
        bar.validate()?;
        let instrument = self.instruments.resolve(&bar.instrument);

        // Phase 1: matching
        let fills = self
            .execution
            .match_orders(&mut state.open_orders, bar, &instrument);

        // Phase 2: accounting
        let mut fill_reports = Vec::with_capacity(fills.len());
        for Fill { order, price } in fills {
            let commission = self.cost_model().commission(order.abs_units(), price);
            accounting::apply_fill(state, &order, price, commission, at);
            tracing::info!(
                order_id = %order.id,
                instrument = %order.instrument,
                units = order.signed_units,
                price,
                commission,
                "order filled"
            );
            fill_reports.push(FillReport {
                order,
                fill_price: price,
                commission,
            });
        }

        // Phase 3: stops
        let closed = stops::process_stops(state, bar, at);
        for trade in &closed {
            tracing::info!(
                order_id = %trade.order_id,
                instrument = %trade.instrument,
                reason = ?trade.close_reason,
                price = ?trade.close_price,
                pnl = ?trade.pnl,
                "trade closed"
            );
        }

        // Phase 4: mark-to-market
        accounting::mark(state, &bar.instrument, bar.close, self.mark_policy, at);

        tracing::debug!(
            instrument = %bar.instrument,
            fills = fill_reports.len(),
            closed = closed.len(),
            pending = state.open_orders.len(),
            equity = state.equity,
            "bar processed"
        );

        Ok(BarReport {
            instrument: bar.instrument.clone(),
            fills: fill_reports,
            closed,
            cash: state.cash,
            equity: state.equity,
        })
    }
}
