//! Local orderbook reconstruction.
//!
//! This module keeps one order book per subscription key in sync with the
//! exchange from an initial snapshot plus a stream of sequenced deltas:
//!
//! - [`merge_side`] merges one side with a delta in a single linear pass
//! - [`OrderbookCache`] owns the books, checks sequence continuity and
//!   tracks each key's [`BookState`]
//! - [`OrderbookManager`] shares a cache across tasks and routes decoded
//!   notifications into it
//!
//! # Example
//!
//! ```rust
//! use cryptomarket::orderbook::{OrderbookCache, UpdateOutcome};
//! use cryptomarket::Decimal;
//! use cryptomarket::types::{BookUpdate, OrderbookDelta, OrderbookSnapshot, PriceLevel, Timestamp};
//!
//! let mut cache = OrderbookCache::new();
//! let key = "ORDERBOOK:ETHBTC:";
//!
//! cache.update(key, BookUpdate::Snapshot(OrderbookSnapshot {
//!     symbol: "ETHBTC".into(),
//!     sequence: 1,
//!     timestamp: Timestamp::Millis(0),
//!     ask: vec![PriceLevel::new(Decimal::new(10, 0), Decimal::new(5, 0))],
//!     bid: vec![PriceLevel::new(Decimal::new(9, 0), Decimal::new(3, 0))],
//! }));
//!
//! // Sequence 5 does not follow 1: the book is flagged, not mutated
//! let outcome = cache.update(key, BookUpdate::Delta(OrderbookDelta {
//!     symbol: "ETHBTC".into(),
//!     from_sequence: 5,
//!     to_sequence: 6,
//!     timestamp: Timestamp::Millis(1),
//!     ask: None,
//!     bid: None,
//! }));
//!
//! assert!(matches!(outcome, UpdateOutcome::Broken { expected: 1, received: 5 }));
//! assert!(cache.is_broken(key));
//! ```

pub mod book;
pub mod cache;
pub mod manager;
pub mod merge;

pub use book::{BookSide, OrderBook};
pub use cache::{BookState, OrderbookCache, UpdateOutcome};
pub use manager::{BookEvent, OrderbookManager};
pub use merge::{merge_side, SortDirection};
