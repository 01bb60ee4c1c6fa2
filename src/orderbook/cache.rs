//! Per-key orderbook reconstruction from snapshots and sequential deltas.
//!
//! # State Machine
//!
//! ```text
//!                 gap detected              dispatcher acks
//!   Updating ───────────────────> Broken ───────────────────> Waiting
//!      ^                                                         │
//!      └──────────────────────── new snapshot ───────────────────┘
//! ```
//!
//! A snapshot moves any key (new or existing, in any state) to `Updating`.
//! Deltas are only applied while `Updating`; in every other state they are
//! dropped without touching the book.

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use super::book::{BookSide, OrderBook};
use super::merge::merge_side;
use crate::types::{BookUpdate, OrderbookDelta, OrderbookSnapshot};

/// Synchronization state of one key's book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookState {
    /// Book is live and accepting deltas
    Updating,
    /// A fresh snapshot has been requested; deltas are dropped until it arrives
    Waiting,
    /// A sequence gap was detected; the book must be re-snapshotted
    Broken,
}

/// What a call to [`OrderbookCache::update`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A snapshot replaced the book
    Replaced,
    /// A delta was merged into the book
    Applied,
    /// A delta was dropped because the book is not `Updating`
    Ignored,
    /// A delta did not continue the stored sequence; the key is now `Broken`
    Broken {
        /// Sequence the delta had to start from
        expected: u64,
        /// Sequence the delta actually started from
        received: u64,
    },
}

#[derive(Debug)]
struct Entry {
    book: OrderBook,
    state: BookState,
}

/// Owner of every reconstructed book and its state.
///
/// Book and state live in the same entry, so they are created together on
/// the first snapshot and removed together.
///
/// # Thread Safety
///
/// The cache holds no lock. Calls for the same key must be serialized by the
/// caller; [`OrderbookManager`](super::OrderbookManager) does this with a
/// `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct OrderbookCache {
    entries: FxHashMap<String, Entry>,
}

impl OrderbookCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a snapshot or delta to the book at `key`.
    ///
    /// Never fails: sequence gaps and stale deltas are reported through the
    /// returned [`UpdateOutcome`] and the key's [`BookState`].
    pub fn update(&mut self, key: &str, update: BookUpdate) -> UpdateOutcome {
        match update {
            BookUpdate::Snapshot(snapshot) => self.apply_snapshot(key, snapshot),
            BookUpdate::Delta(delta) => self.apply_delta(key, &delta),
        }
    }

    fn apply_snapshot(&mut self, key: &str, snapshot: OrderbookSnapshot) -> UpdateOutcome {
        let book = OrderBook::from(snapshot);
        debug!(key, sequence = book.sequence, "orderbook snapshot installed");

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.book = book;
                entry.state = BookState::Updating;
            }
            None => {
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        book,
                        state: BookState::Updating,
                    },
                );
            }
        }
        UpdateOutcome::Replaced
    }

    fn apply_delta(&mut self, key: &str, delta: &OrderbookDelta) -> UpdateOutcome {
        let Some(entry) = self.entries.get_mut(key) else {
            trace!(key, "delta for unknown book dropped");
            return UpdateOutcome::Ignored;
        };

        if entry.state != BookState::Updating {
            trace!(key, state = ?entry.state, "delta dropped while recovering");
            return UpdateOutcome::Ignored;
        }

        let expected = entry.book.sequence;
        if delta.from_sequence != expected {
            warn!(
                key,
                expected,
                received = delta.from_sequence,
                "orderbook sequence gap, book marked broken"
            );
            entry.state = BookState::Broken;
            return UpdateOutcome::Broken {
                expected,
                received: delta.from_sequence,
            };
        }

        if delta.is_empty() {
            trace!(key, sequence = delta.to_sequence, "empty delta, sequence advanced");
        } else {
            for (side, levels) in [(BookSide::Ask, &delta.ask), (BookSide::Bid, &delta.bid)] {
                if let Some(levels) = levels {
                    let merged = merge_side(entry.book.side(side), levels, side.direction());
                    *entry.book.side_mut(side) = merged;
                }
            }
        }
        entry.book.sequence = delta.to_sequence;
        entry.book.timestamp = delta.timestamp.clone();

        trace!(key, sequence = delta.to_sequence, "orderbook delta applied");
        UpdateOutcome::Applied
    }

    /// Get an independent copy of the book at `key`.
    ///
    /// Returns `None` until a snapshot has been applied for `key`.
    #[must_use]
    pub fn get_orderbook(&self, key: &str) -> Option<OrderBook> {
        self.entries.get(key).map(|e| e.book.clone())
    }

    /// Get the state of the book at `key`
    #[must_use]
    pub fn state(&self, key: &str) -> Option<BookState> {
        self.entries.get(key).map(|e| e.state)
    }

    /// Whether the book at `key` is waiting for a fresh snapshot
    #[must_use]
    pub fn is_waiting(&self, key: &str) -> bool {
        self.state(key) == Some(BookState::Waiting)
    }

    /// Whether the book at `key` has detected a sequence gap
    #[must_use]
    pub fn is_broken(&self, key: &str) -> bool {
        self.state(key) == Some(BookState::Broken)
    }

    /// Record that a fresh snapshot has been requested for `key`.
    ///
    /// Unknown keys are left alone.
    pub fn mark_waiting_for_snapshot(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            debug!(key, "orderbook waiting for snapshot");
            entry.state = BookState::Waiting;
        }
    }

    /// Drop the book and state at `key` (on unsubscription)
    pub fn remove(&mut self, key: &str) -> Option<OrderBook> {
        self.entries.remove(key).map(|e| e.book)
    }

    /// All keys currently in `Broken` state
    #[must_use]
    pub fn broken_keys(&self) -> Vec<String> {
        self.keys_in_state(BookState::Broken)
    }

    /// All keys currently in `Waiting` state
    #[must_use]
    pub fn waiting_keys(&self) -> Vec<String> {
        self.keys_in_state(BookState::Waiting)
    }

    fn keys_in_state(&self, state: BookState) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.state == state)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// All tracked keys
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of tracked books
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no book is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every book
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
