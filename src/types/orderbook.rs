//! Orderbook notification payloads.
//!
//! The exchange pushes two kinds of orderbook notifications over the
//! WebSocket: a full snapshot (`snapshotOrderbook`) and an incremental
//! delta (`updateOrderbook`). The REST `public/orderbook` endpoint returns
//! the snapshot shape as well.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PriceLevel;

/// Time value attached to book states.
///
/// The exchange sends either an ISO 8601 string or a Unix millisecond
/// number, so both are accepted and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Unix timestamp in milliseconds
    Millis(u64),
    /// ISO 8601 formatted string
    Text(String),
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::Millis(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Millis(ms) => write!(f, "{}", ms),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Timestamp {
    fn from(ms: u64) -> Self {
        Timestamp::Millis(ms)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp::Text(s.to_string())
    }
}

/// Full orderbook state, delivered atomically.
///
/// A snapshot is always authoritative: it replaces whatever the cache holds
/// for its key, regardless of the previous sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookSnapshot {
    /// Trading symbol (e.g. "ETHBTC")
    #[serde(default)]
    pub symbol: String,
    /// Sequence number of this book state
    pub sequence: u64,
    /// Server time of this book state
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Ask levels, lowest price first
    #[serde(default)]
    pub ask: Vec<PriceLevel>,
    /// Bid levels, highest price first
    #[serde(default)]
    pub bid: Vec<PriceLevel>,
}

/// Incremental orderbook change.
///
/// Valid only when applied directly on top of the book state whose sequence
/// equals `from_sequence`. A missing side means "no change on that side".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookDelta {
    /// Trading symbol (e.g. "ETHBTC")
    #[serde(default)]
    pub symbol: String,
    /// Sequence of the book state this delta applies to
    pub from_sequence: u64,
    /// Sequence of the book state after this delta
    pub to_sequence: u64,
    /// Server time of the resulting book state
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Changed ask levels, lowest price first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Vec<PriceLevel>>,
    /// Changed bid levels, highest price first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Vec<PriceLevel>>,
}

impl OrderbookDelta {
    /// Whether this delta carries no level changes at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ask.as_ref().map_or(true, Vec::is_empty)
            && self.bid.as_ref().map_or(true, Vec::is_empty)
    }
}

/// One orderbook notification: its kind together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookUpdate {
    /// Full replacement of the book
    Snapshot(OrderbookSnapshot),
    /// Incremental change on top of the stored book
    Delta(OrderbookDelta),
}

impl BookUpdate {
    /// Symbol the update belongs to
    pub fn symbol(&self) -> &str {
        match self {
            BookUpdate::Snapshot(s) => &s.symbol,
            BookUpdate::Delta(d) => &d.symbol,
        }
    }

    /// Whether this is a snapshot
    pub fn is_snapshot(&self) -> bool {
        matches!(self, BookUpdate::Snapshot(_))
    }
}
