use serde::{Deserialize, Serialize};
use std::fmt;

const PAPER_PREFIX: &str = "PAPER-";

/// Broker-assigned order ID, `PAPER-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// ID for the n-th order issued by a ledger.
    pub fn paper(seq: u64) -> Self {
        Self(format!("{PAPER_PREFIX}{seq}"))
    }

    /// The numeric part of a `PAPER-<n>` id, if this id has that shape.
    pub fn seq(&self) -> Option<u64> {
        self.0.strip_prefix(PAPER_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
