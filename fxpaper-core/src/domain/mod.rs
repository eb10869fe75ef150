//! Domain types for the paper broker

pub mod account;
pub mod bar;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod position;
pub mod trade;

pub use account::AccountState;
pub use bar::{BarError, PriceBar};
pub use ids::OrderId;
pub use instrument::{Instrument, InstrumentTable};
pub use order::{
    EntryType, Order, OrderRequest, OrderSide, OrderStatus, PlaceOrderResponse, RejectReason,
    MAX_ORDER_UNITS,
};
pub use position::Position;
pub use trade::{CloseReason, TradeRecord, TradeStatus};
