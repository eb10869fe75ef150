//! Paper broker facade.
//!
//! `PaperBroker` owns the ledger store and the committed account state behind
//! one mutex. Every mutating call runs on a copy of the state and commits the
//! copy only after the ledger write succeeds, so memory and disk never
//! diverge and a bar redelivered after a failed save is applied once.

use crate::config::PaperConfig;
use crate::domain::{
    AccountState, CloseReason, Order, OrderId, OrderRequest, OrderStatus, PlaceOrderResponse,
    PriceBar, TradeRecord,
};
use crate::engine::{stops, BarReport, PaperEngine};
use crate::error::BrokerError;
use crate::ledger::LedgerStore;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct PaperBroker {
    config: PaperConfig,
    engine: PaperEngine,
    store: LedgerStore,
    state: Mutex<AccountState>,
}

impl PaperBroker {
    /// Validate `config` and load (or initialize) the ledger it points at.
    pub fn open(config: PaperConfig) -> Result<Self, BrokerError> {
        config.validate()?;
        let store = LedgerStore::new(&config.ledger_path);
        let state = store.load(config.initial_cash)?;
        tracing::info!(
            ledger = %store.path().display(),
            cash = state.cash,
            equity = state.equity,
            open_orders = state.open_orders.len(),
            "paper broker opened"
        );
        Ok(Self {
            engine: PaperEngine::from_config(&config),
            config,
            store,
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    pub fn ledger_path(&self) -> &Path {
        self.store.path()
    }

    // Committed state is only ever replaced whole, so a poisoned lock still
    // guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on a copy of the state, persist the copy, then commit it.
    fn transact<T>(
        &self,
        f: impl FnOnce(&mut AccountState) -> Result<T, BrokerError>,
    ) -> Result<T, BrokerError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.store.save(&next)?;
        *guard = next;
        Ok(out)
    }

    /// Validate and queue an order.
    ///
    /// Rejections leave the ledger untouched and are not errors; only a
    /// failed save is.
    pub fn place_order(&self, request: OrderRequest) -> Result<PlaceOrderResponse, BrokerError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let id = next.next_order_id();
        let order = match request.into_order(id, Utc::now()) {
            Ok(order) => order,
            Err(reason) => {
                tracing::warn!(%reason, "order rejected");
                return Ok(PlaceOrderResponse::Rejected { reason });
            }
        };

        let order_id = order.id.clone();
        tracing::info!(
            order_id = %order_id,
            instrument = %order.instrument,
            units = order.signed_units,
            entry_type = %order.entry_type,
            "order accepted"
        );
        next.open_orders.push(order);
        self.store.save(&next)?;
        *guard = next;
        Ok(PlaceOrderResponse::Accepted { order_id })
    }

    /// Deliver one bar for `instrument`.
    pub fn on_bar(
        &self,
        instrument: &str,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<BarReport, BrokerError> {
        self.apply_bar(&PriceBar::new(instrument, open, high, low, close))
    }

    pub fn apply_bar(&self, bar: &PriceBar) -> Result<BarReport, BrokerError> {
        self.apply_bar_at(bar, Utc::now())
    }

    /// Deliver a bar stamped with `at` instead of the wall clock.
    pub fn apply_bar_at(&self, bar: &PriceBar, at: DateTime<Utc>) -> Result<BarReport, BrokerError> {
        self.transact(|state| Ok(self.engine.process_bar(state, bar, at)?))
    }

    /// Deep copy of the committed state.
    pub fn snapshot(&self) -> AccountState {
        self.lock().clone()
    }

    /// Wipe the ledger back to the configured initial cash. On failure both
    /// memory and disk keep the prior state.
    pub fn reset(&self) -> Result<(), BrokerError> {
        let mut guard = self.lock();
        *guard = self.store.reset(self.config.initial_cash)?;
        Ok(())
    }

    /// Remove a pending order, returning it marked `Cancelled`.
    pub fn cancel_order(&self, order_id: &OrderId) -> Result<Order, BrokerError> {
        let order = self.transact(|state| {
            let index = state
                .open_orders
                .iter()
                .position(|o| &o.id == order_id)
                .ok_or_else(|| BrokerError::UnknownOrder(order_id.clone()))?;
            let mut order = state.open_orders.remove(index);
            order.status = OrderStatus::Cancelled;
            Ok(order)
        })?;
        tracing::info!(order_id = %order.id, instrument = %order.instrument, "order cancelled");
        Ok(order)
    }

    /// `Pending` while queued, `Filled` once a trade carries the id.
    pub fn order_status(&self, order_id: &OrderId) -> Option<OrderStatus> {
        let state = self.lock();
        if state.open_orders.iter().any(|o| &o.id == order_id) {
            Some(OrderStatus::Pending)
        } else if state.trade_for_order(order_id).is_some() {
            Some(OrderStatus::Filled)
        } else {
            None
        }
    }

    /// Close the open trade created by `order_id` at `price`.
    pub fn close_trade(&self, order_id: &OrderId, price: f64) -> Result<TradeRecord, BrokerError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(BrokerError::InvalidClosePrice(price));
        }
        let closed = self.transact(|state| {
            let index = state
                .history
                .iter()
                .position(|t| &t.order_id == order_id && t.is_open())
                .ok_or_else(|| BrokerError::TradeNotOpen(order_id.clone()))?;
            stops::close_trade(state, index, price, CloseReason::Manual, Utc::now())
                .ok_or_else(|| BrokerError::TradeNotOpen(order_id.clone()))?;
            Ok(state.history[index].clone())
        })?;
        tracing::info!(
            order_id = %closed.order_id,
            instrument = %closed.instrument,
            price,
            pnl = ?closed.pnl,
            "trade closed manually"
        );
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RejectReason;
    use std::fs;
    use tempfile::TempDir;

    fn broker(tmp: &TempDir) -> PaperBroker {
        PaperBroker::open(PaperConfig::with_ledger(tmp.path().join("ledger.json"))).unwrap()
    }

    #[test]
    fn rejected_order_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        let resp = b
            .place_order(OrderRequest::market("EUR_USD", "hold", 1000))
            .unwrap();
        assert_eq!(
            resp,
            PlaceOrderResponse::Rejected {
                reason: RejectReason::InvalidSide
            }
        );
        assert!(!b.ledger_path().exists());
        assert_eq!(b.snapshot(), AccountState::new(100_000.0));
    }

    #[test]
    fn accepted_order_is_persisted() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        let resp = b
            .place_order(OrderRequest::limit("EUR_USD", "buy", 1000, 1.05))
            .unwrap();
        assert_eq!(resp.order_id(), Some(&OrderId::paper(1)));

        let reopened = broker(&tmp);
        assert_eq!(reopened.snapshot(), b.snapshot());
        assert_eq!(
            reopened.order_status(&OrderId::paper(1)),
            Some(OrderStatus::Pending)
        );
    }

    #[test]
    fn cancel_unknown_order_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        let err = b.cancel_order(&OrderId::paper(7)).unwrap_err();
        assert!(matches!(err, BrokerError::UnknownOrder(_)));
    }

    #[test]
    fn invalid_config_is_refused() {
        let tmp = TempDir::new().unwrap();
        let mut config = PaperConfig::with_ledger(tmp.path().join("ledger.json"));
        config.spread_pips = -1.0;
        assert!(matches!(
            PaperBroker::open(config),
            Err(BrokerError::Config(_))
        ));
    }

    #[test]
    fn failed_save_keeps_committed_state() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        b.place_order(OrderRequest::market("EUR_USD", "buy", 1000))
            .unwrap();
        let before = b.snapshot();

        // A non-empty directory where the ledger file should be makes the
        // final rename fail.
        fs::remove_file(b.ledger_path()).unwrap();
        fs::create_dir_all(b.ledger_path().join("blocker")).unwrap();

        let err = b.on_bar("EUR_USD", 1.10, 1.11, 1.09, 1.10).unwrap_err();
        assert!(matches!(err, BrokerError::Ledger(_)));
        assert_eq!(b.snapshot(), before);

        // Redelivery after the fault clears applies the bar exactly once
        fs::remove_dir_all(b.ledger_path()).unwrap();
        let report = b.on_bar("EUR_USD", 1.10, 1.11, 1.09, 1.10).unwrap();
        assert_eq!(report.fills.len(), 1);
        assert_eq!(b.snapshot().history.len(), 1);
    }

    #[test]
    fn failed_reset_keeps_ledger_and_memory() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        b.place_order(OrderRequest::market("EUR_USD", "buy", 1000))
            .unwrap();
        b.on_bar("EUR_USD", 1.10, 1.11, 1.09, 1.10).unwrap();
        let before = b.snapshot();
        let on_disk = fs::read_to_string(b.ledger_path()).unwrap();

        // A non-empty directory at the temp path makes the write fail
        let tmp_path = b.ledger_path().with_file_name("ledger.json.tmp");
        fs::create_dir_all(tmp_path.join("blocker")).unwrap();

        assert!(matches!(b.reset(), Err(BrokerError::Ledger(_))));
        assert_eq!(b.snapshot(), before);
        assert_eq!(fs::read_to_string(b.ledger_path()).unwrap(), on_disk);

        fs::remove_dir_all(&tmp_path).unwrap();
        b.reset().unwrap();
        assert_eq!(b.snapshot(), AccountState::new(100_000.0));
    }

    #[test]
    fn close_trade_rejects_bad_price() {
        let tmp = TempDir::new().unwrap();
        let b = broker(&tmp);
        let err = b.close_trade(&OrderId::paper(1), f64::NAN).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidClosePrice(_)));
    }
}
