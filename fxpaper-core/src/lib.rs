//! FxPaper Core: a bar-driven FX paper-trading broker.
//!
//! This crate contains:
//! - Domain types (orders, positions, trade records, account state, instruments)
//! - Bar engine with four phases per bar (matching, accounting, stops, mark)
//! - Cost model for spread, slippage and commission
//! - Atomic JSON ledger store
//! - `PaperBroker`, the thread-safe facade over all of the above

pub mod broker;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;

pub use broker::PaperBroker;
pub use config::{ConfigError, MarkPolicy, PaperConfig};
pub use engine::{BarReport, FillReport};
pub use error::BrokerError;
pub use ledger::{LedgerError, LedgerStore};
