use crate::config::ConfigError;
use crate::domain::{BarError, OrderId};
use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by broker operations. Order validation failures are not
/// errors; they come back as `PlaceOrderResponse::Rejected`.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("invalid bar: {0}")]
    InvalidBar(#[from] BarError),

    #[error("no pending order with id {0}")]
    UnknownOrder(OrderId),

    #[error("no open trade for order {0}")]
    TradeNotOpen(OrderId),

    #[error("close price must be finite and positive, got {0}")]
    InvalidClosePrice(f64),
}
