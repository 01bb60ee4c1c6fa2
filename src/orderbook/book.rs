//! Core orderbook data structure.
//!
//! An [`OrderBook`] is the reconstructed state of one subscription's book:
//! two sorted vectors of price levels plus the sequence and timestamp of the
//! server state they reflect.
//!
//! Sorted `Vec`s rather than tree maps are used because every delta is
//! applied as one linear merge per side (see [`merge_side`](super::merge_side)),
//! and readers mostly want the top of book or an in-order walk.

use rust_decimal::Decimal;

use super::merge::SortDirection;
use crate::types::{OrderbookSnapshot, Price, PriceLevel, Size, Timestamp};

/// One side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSide {
    /// Sell orders, lowest price first
    Ask,
    /// Buy orders, highest price first
    Bid,
}

impl BookSide {
    /// Ordering rule of this side
    #[must_use]
    pub const fn direction(self) -> SortDirection {
        match self {
            BookSide::Ask => SortDirection::Ascending,
            BookSide::Bid => SortDirection::Descending,
        }
    }
}

/// Reconstructed orderbook for a single subscription key.
///
/// # Invariants
///
/// - `ask` is sorted ascending and `bid` descending by price, with unique
///   prices per side.
/// - No committed level has a zero size.
///
/// Cloning produces a fully independent copy; this is how the cache hands
/// books out to readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBook {
    /// Sequence number of the server state this book reflects
    pub sequence: u64,
    /// Server time of that state
    pub timestamp: Timestamp,
    /// Ask levels, lowest price first
    pub ask: Vec<PriceLevel>,
    /// Bid levels, highest price first
    pub bid: Vec<PriceLevel>,
}

impl OrderBook {
    /// Create an empty book at the given sequence
    #[must_use]
    pub fn new(sequence: u64, timestamp: Timestamp) -> Self {
        Self {
            sequence,
            timestamp,
            ask: Vec::new(),
            bid: Vec::new(),
        }
    }

    /// Levels of one side, best first
    #[must_use]
    pub fn side(&self, side: BookSide) -> &[PriceLevel] {
        match side {
            BookSide::Ask => &self.ask,
            BookSide::Bid => &self.bid,
        }
    }

    pub(crate) fn side_mut(&mut self, side: BookSide) -> &mut Vec<PriceLevel> {
        match side {
            BookSide::Ask => &mut self.ask,
            BookSide::Bid => &mut self.bid,
        }
    }

    /// Get the best bid (highest price)
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bid.first()
    }

    /// Get the best ask (lowest price)
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.ask.first()
    }

    /// Get the mid price
    ///
    /// Returns the average of best bid and best ask, or `None` if either is missing.
    #[must_use]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get the spread (best ask - best bid)
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy book but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Get the top N bid levels
    #[must_use]
    pub fn top_bids(&self, n: usize) -> &[PriceLevel] {
        &self.bid[..n.min(self.bid.len())]
    }

    /// Get the top N ask levels
    #[must_use]
    pub fn top_asks(&self, n: usize) -> &[PriceLevel] {
        &self.ask[..n.min(self.ask.len())]
    }

    /// Get total bid size
    #[must_use]
    pub fn total_bid_size(&self) -> Size {
        self.bid.iter().map(|l| l.size).sum()
    }

    /// Get total ask size
    #[must_use]
    pub fn total_ask_size(&self) -> Size {
        self.ask.iter().map(|l| l.size).sum()
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bid.is_empty() && self.ask.is_empty()
    }

    /// Get the number of price levels as `(asks, bids)`
    #[must_use]
    pub fn depth(&self) -> (usize, usize) {
        (self.ask.len(), self.bid.len())
    }
}

impl From<OrderbookSnapshot> for OrderBook {
    fn from(snapshot: OrderbookSnapshot) -> Self {
        Self {
            sequence: snapshot.sequence,
            timestamp: snapshot.timestamp,
            ask: snapshot.ask,
            bid: snapshot.bid,
        }
    }
}
