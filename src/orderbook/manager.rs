//! Orderbook manager for sharing the cache across tasks.
//!
//! This module provides [`OrderbookManager`], a thread-safe wrapper around
//! [`OrderbookCache`] that routes decoded WebSocket notifications into it.
//!
//! # Design
//!
//! The cache itself holds no lock. The manager serializes every write behind
//! one `parking_lot::RwLock`, so updates for a key are applied one at a time
//! in delivery order, while readers only ever receive cloned books and never
//! observe a half-merged side.

use parking_lot::RwLock;
use tracing::debug;

use super::cache::{BookState, OrderbookCache, UpdateOutcome};
use super::OrderBook;
use crate::types::messages::{subscription_key, FeedKind, Notification};
use crate::types::BookUpdate;

/// Result of routing one orderbook notification into the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEvent {
    /// Routing key of the book
    pub key: String,
    /// Symbol of the book
    pub symbol: String,
    /// What the cache did with the notification
    pub outcome: UpdateOutcome,
}

impl BookEvent {
    /// Whether the book needs a fresh snapshot
    pub fn needs_resync(&self) -> bool {
        matches!(self.outcome, UpdateOutcome::Broken { .. })
    }
}

/// Thread-safe owner of all orderbooks.
///
/// # Example
///
/// ```rust
/// use cryptomarket::orderbook::OrderbookManager;
/// use cryptomarket::types::WsMessage;
///
/// let manager = OrderbookManager::new();
///
/// let msg = WsMessage::parse(r#"{
///     "method": "snapshotOrderbook",
///     "params": {"symbol": "ETHBTC", "sequence": 1, "timestamp": 0,
///                "ask": [{"price": "0.05", "size": "1"}], "bid": []}
/// }"#).unwrap();
///
/// if let WsMessage::Notification(n) = msg {
///     manager.handle_notification(&n);
/// }
///
/// let book = manager.orderbook_for_symbol("ETHBTC").unwrap();
/// assert_eq!(book.sequence, 1);
/// ```
#[derive(Debug, Default)]
pub struct OrderbookManager {
    cache: RwLock<OrderbookCache>,
}

impl OrderbookManager {
    /// Create a new orderbook manager
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(OrderbookCache::new()),
        }
    }

    /// Route a notification into the cache.
    ///
    /// Returns `None` for notifications that are not orderbook snapshots or
    /// deltas; those bypass the cache entirely.
    pub fn handle_notification(&self, notification: &Notification) -> Option<BookEvent> {
        match notification {
            Notification::Orderbook { key, update } => Some(self.apply(key, update.clone())),
            _ => None,
        }
    }

    /// Apply a snapshot or delta to the book at `key`
    pub fn apply(&self, key: &str, update: BookUpdate) -> BookEvent {
        let symbol = update.symbol().to_string();
        let outcome = self.cache.write().update(key, update);
        BookEvent {
            key: key.to_string(),
            symbol,
            outcome,
        }
    }

    /// Get a snapshot of an orderbook
    ///
    /// Returns a cloned copy of the orderbook for safe reading without holding locks.
    pub fn get_orderbook(&self, key: &str) -> Option<OrderBook> {
        self.cache.read().get_orderbook(key)
    }

    /// Get a snapshot of the orderbook for `symbol`
    pub fn orderbook_for_symbol(&self, symbol: &str) -> Option<OrderBook> {
        self.get_orderbook(&subscription_key(FeedKind::Orderbook, symbol, None))
    }

    /// Get the state of an orderbook
    pub fn state(&self, key: &str) -> Option<BookState> {
        self.cache.read().state(key)
    }

    /// Whether the book at `key` is waiting for a fresh snapshot
    pub fn is_waiting(&self, key: &str) -> bool {
        self.cache.read().is_waiting(key)
    }

    /// Whether the book at `key` has detected a sequence gap
    pub fn is_broken(&self, key: &str) -> bool {
        self.cache.read().is_broken(key)
    }

    /// Record that a fresh snapshot has been requested for `key`
    pub fn mark_waiting_for_snapshot(&self, key: &str) {
        self.cache.write().mark_waiting_for_snapshot(key);
    }

    /// Stop tracking the book at `key`
    pub fn remove(&self, key: &str) {
        if self.cache.write().remove(key).is_some() {
            debug!(key, "orderbook removed");
        }
    }

    /// Get all books that are broken or waiting for a snapshot
    pub fn keys_needing_resync(&self) -> Vec<String> {
        let cache = self.cache.read();
        let mut keys = cache.broken_keys();
        keys.extend(cache.waiting_keys());
        keys
    }

    /// Get all keys in `Waiting` state
    pub fn waiting_keys(&self) -> Vec<String> {
        self.cache.read().waiting_keys()
    }

    /// Clear all orderbooks
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Get number of tracked books
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if manager has no books
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Get all tracked keys
    pub fn keys(&self) -> Vec<String> {
        self.cache.read().keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderbookDelta, OrderbookSnapshot, PriceLevel, Timestamp};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const KEY: &str = "ORDERBOOK:ETHBTC:";

    fn snapshot_notification(sequence: u64) -> Notification {
        Notification::Orderbook {
            key: KEY.to_string(),
            update: BookUpdate::Snapshot(OrderbookSnapshot {
                symbol: "ETHBTC".to_string(),
                sequence,
                timestamp: Timestamp::Millis(0),
                ask: vec![PriceLevel::new(dec!(0.05), dec!(1))],
                bid: vec![PriceLevel::new(dec!(0.04), dec!(2))],
            }),
        }
    }

    fn delta_notification(from: u64, to: u64) -> Notification {
        Notification::Orderbook {
            key: KEY.to_string(),
            update: BookUpdate::Delta(OrderbookDelta {
                symbol: "ETHBTC".to_string(),
                from_sequence: from,
                to_sequence: to,
                timestamp: Timestamp::Millis(to),
                ask: Some(vec![PriceLevel::new(dec!(0.05), dec!(3))]),
                bid: None,
            }),
        }
    }

    #[test]
    fn test_snapshot_and_delta() {
        let manager = OrderbookManager::new();

        let event = manager.handle_notification(&snapshot_notification(1)).unwrap();
        assert_eq!(event.outcome, UpdateOutcome::Replaced);
        assert_eq!(event.symbol, "ETHBTC");

        let event = manager.handle_notification(&delta_notification(1, 2)).unwrap();
        assert_eq!(event.outcome, UpdateOutcome::Applied);
        assert!(!event.needs_resync());

        let book = manager.orderbook_for_symbol("ethbtc").unwrap();
        assert_eq!(book.sequence, 2);
        assert_eq!(book.best_ask().unwrap().size, dec!(3));
    }

    #[test]
    fn test_gap_reports_resync() {
        let manager = OrderbookManager::new();
        manager.handle_notification(&snapshot_notification(1));

        let event = manager.handle_notification(&delta_notification(4, 5)).unwrap();
        assert!(event.needs_resync());
        assert!(manager.is_broken(KEY));
        assert_eq!(manager.keys_needing_resync(), vec![KEY.to_string()]);

        manager.mark_waiting_for_snapshot(KEY);
        assert!(manager.is_waiting(KEY));
        assert_eq!(manager.keys_needing_resync(), vec![KEY.to_string()]);

        manager.handle_notification(&snapshot_notification(9));
        assert_eq!(manager.state(KEY), Some(BookState::Updating));
        assert!(manager.keys_needing_resync().is_empty());
    }

    #[test]
    fn test_non_orderbook_notification_bypasses_cache() {
        let manager = OrderbookManager::new();
        let other = Notification::Other {
            method: "report".to_string(),
            params: serde_json::Value::Null,
        };

        assert_eq!(manager.handle_notification(&other), None);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_concurrent_readers_see_whole_books() {
        let manager = Arc::new(OrderbookManager::new());
        manager.handle_notification(&snapshot_notification(0));

        let writer = {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                for seq in 0..500 {
                    manager.handle_notification(&delta_notification(seq, seq + 1));
                }
            })
        };

        for _ in 0..500 {
            let book = manager.get_orderbook(KEY).unwrap();
            assert_eq!(book.ask.len(), 1);
            assert_eq!(book.bid.len(), 1);
        }

        writer.join().unwrap();
        assert_eq!(manager.get_orderbook(KEY).unwrap().sequence, 500);
    }

    #[test]
    fn test_remove() {
        let manager = OrderbookManager::new();
        manager.handle_notification(&snapshot_notification(1));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.keys(), vec![KEY.to_string()]);

        manager.remove(KEY);
        assert!(manager.is_empty());
        assert_eq!(manager.get_orderbook(KEY), None);
    }
}
