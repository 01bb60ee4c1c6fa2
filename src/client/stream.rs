//! Market data stream that keeps local orderbooks in sync.
//!
//! [`MarketDataStream`] reads from a [`ReconnectingWebSocket`], feeds every
//! orderbook notification through a shared [`OrderbookManager`] and recovers
//! from sequence gaps by requesting a fresh snapshot. Other notifications and
//! request responses are passed through to the caller unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use cryptomarket::client::stream::{MarketDataStream, StreamEvent};
//! use cryptomarket::Config;
//!
//! # async fn example() -> cryptomarket::Result<()> {
//! let mut stream = MarketDataStream::connect(Config::public()).await?;
//! stream.subscribe_orderbook("ETHBTC").await?;
//!
//! let books = stream.books();
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::Book(event) = event? {
//!         if let Some(book) = books.get_orderbook(&event.key) {
//!             println!("{} mid {:?}", event.symbol, book.mid_price());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::websocket::{ReconnectingWebSocket, Subscription};
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::{BookEvent, OrderbookManager, UpdateOutcome};
use crate::types::market::{Candle, Period, PublicTrade, Ticker};
use crate::types::messages::{
    subscription_key, FeedKind, MethodKind, Notification, RpcError, WsMessage,
};

/// One event produced by [`MarketDataStream::next`]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An orderbook notification was applied to the local cache
    Book(BookEvent),
    /// Public trades
    Trades {
        /// Snapshot or update
        kind: MethodKind,
        /// Symbol
        symbol: String,
        /// Trades, oldest first
        data: Vec<PublicTrade>,
    },
    /// Candles
    Candles {
        /// Snapshot or update
        kind: MethodKind,
        /// Symbol
        symbol: String,
        /// Candle period
        period: Period,
        /// Candles, oldest first
        data: Vec<Candle>,
    },
    /// Ticker update
    Ticker(Ticker),
    /// Response to a request sent on this stream
    Response {
        /// Request ID
        id: Option<u64>,
        /// Result or error returned by the server
        result: Result<Value, RpcError>,
    },
    /// Notification this crate does not interpret
    Other {
        /// Method name
        method: String,
        /// Raw parameters
        params: Value,
    },
}

/// A snapshot request that has not been answered by a snapshot yet
#[derive(Debug, Clone)]
struct PendingResync {
    symbol: String,
    requested_at: Instant,
}

impl PendingResync {
    fn new(symbol: impl Into<String>, now: Instant) -> Self {
        Self {
            symbol: symbol.into(),
            requested_at: now,
        }
    }

    fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.requested_at) >= timeout
    }
}

/// WebSocket stream with local orderbook maintenance
pub struct MarketDataStream {
    ws: ReconnectingWebSocket,
    books: Arc<OrderbookManager>,
    resync_timeout: Duration,
    resyncs: HashMap<String, PendingResync>,
    seen_connections: u64,
}

impl std::fmt::Debug for MarketDataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataStream")
            .field("ws", &self.ws)
            .field("books", &self.books.len())
            .field("pending_resyncs", &self.resyncs.len())
            .finish()
    }
}

impl MarketDataStream {
    /// Connect with a new, empty orderbook manager
    pub async fn connect(config: Config) -> Result<Self, Error> {
        Self::with_manager(config, Arc::new(OrderbookManager::new())).await
    }

    /// Connect and maintain books in an existing manager
    pub async fn with_manager(
        config: Config,
        books: Arc<OrderbookManager>,
    ) -> Result<Self, Error> {
        let resync_timeout = config.resync_timeout();
        let ws = ReconnectingWebSocket::connect(config).await?;
        let seen_connections = ws.connection_count();

        Ok(Self {
            ws,
            books,
            resync_timeout,
            resyncs: HashMap::new(),
            seen_connections,
        })
    }

    /// Shared handle to the orderbooks maintained by this stream
    pub fn books(&self) -> Arc<OrderbookManager> {
        Arc::clone(&self.books)
    }

    /// Underlying WebSocket connection
    pub fn websocket(&mut self) -> &mut ReconnectingWebSocket {
        &mut self.ws
    }

    /// Authenticate the session with the configured credentials
    pub async fn login(&mut self) -> Result<u64, Error> {
        self.ws.login().await
    }

    /// Subscribe to orderbook updates for `symbol`
    pub async fn subscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.ws.subscribe_orderbook(symbol).await
    }

    /// Unsubscribe from orderbook updates and drop the local book
    pub async fn unsubscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        let key = subscription_key(FeedKind::Orderbook, symbol, None);
        self.resyncs.remove(&key);
        self.books.remove(&key);
        self.ws.unsubscribe_orderbook(symbol).await
    }

    /// Subscribe to public trades
    pub async fn subscribe_trades(
        &mut self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.ws.subscribe_trades(symbol, limit).await
    }

    /// Subscribe to candles
    pub async fn subscribe_candles(
        &mut self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.ws.subscribe_candles(symbol, period, limit).await
    }

    /// Subscribe to ticker updates
    pub async fn subscribe_ticker(&mut self, symbol: &str) -> Result<u64, Error> {
        self.ws.subscribe_ticker(symbol).await
    }

    /// Receive the next event
    ///
    /// Orderbook notifications are applied before the event is returned, so a
    /// book read after receiving [`StreamEvent::Book`] already reflects it.
    /// A book that detects a gap is flagged as waiting and its subscription is
    /// requested again before any further message is read.
    pub async fn next(&mut self) -> Option<Result<StreamEvent, Error>> {
        let msg = match self.ws.next().await? {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };

        if self.ws.connection_count() != self.seen_connections {
            self.seen_connections = self.ws.connection_count();
            self.on_reconnected();
        }

        let event = match msg {
            WsMessage::Notification(Notification::Orderbook { key, update }) => {
                let event = self.books.apply(&key, update);
                if let Err(e) = self.on_book_event(&event).await {
                    return Some(Err(e));
                }
                StreamEvent::Book(event)
            }
            WsMessage::Notification(Notification::Trades {
                kind, symbol, data, ..
            }) => StreamEvent::Trades { kind, symbol, data },
            WsMessage::Notification(Notification::Candles {
                kind,
                symbol,
                period,
                data,
                ..
            }) => StreamEvent::Candles {
                kind,
                symbol,
                period,
                data,
            },
            WsMessage::Notification(Notification::Ticker { ticker, .. }) => {
                StreamEvent::Ticker(ticker)
            }
            WsMessage::Notification(Notification::Other { method, params }) => {
                StreamEvent::Other { method, params }
            }
            WsMessage::Response { id, result } => StreamEvent::Response { id, result },
        };

        if let Err(e) = self.retry_stale_resyncs(Instant::now()).await {
            return Some(Err(e));
        }

        Some(Ok(event))
    }

    async fn on_book_event(&mut self, event: &BookEvent) -> Result<(), Error> {
        let now = Instant::now();
        if let Some(symbol) = track_book_event(&self.books, &mut self.resyncs, event, now) {
            warn!(key = %event.key, outcome = ?event.outcome, "orderbook out of sync");
            self.ws.resubscribe_orderbook(&symbol).await?;
        }
        Ok(())
    }

    /// Ask again for snapshots that have not arrived within the timeout
    async fn retry_stale_resyncs(&mut self, now: Instant) -> Result<(), Error> {
        let stale = stale_resyncs(&self.resyncs, &self.books, now, self.resync_timeout);
        for (key, symbol) in stale {
            warn!(
                key = %key,
                timeout = ?self.resync_timeout,
                "snapshot not received, resubscribing"
            );
            begin_resync(&self.books, &mut self.resyncs, &key, &symbol, now);
            self.ws.resubscribe_orderbook(&symbol).await?;
        }
        Ok(())
    }

    /// The new connection replays every subscription, so each book will get
    /// a fresh snapshot. Deltas until then cannot be trusted.
    fn on_reconnected(&mut self) {
        debug!(books = self.books.len(), "marking orderbooks waiting after reconnect");
        track_reconnect(
            &self.books,
            &mut self.resyncs,
            self.ws.saved_subscriptions(),
            Instant::now(),
        );
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<(), Error> {
        self.ws.close().await
    }
}

/// Flag `key` as waiting and start the resync clock for it
fn begin_resync(
    books: &OrderbookManager,
    resyncs: &mut HashMap<String, PendingResync>,
    key: &str,
    symbol: &str,
    now: Instant,
) {
    books.mark_waiting_for_snapshot(key);
    resyncs.insert(key.to_string(), PendingResync::new(symbol, now));
}

/// Update resync bookkeeping for one applied book event.
///
/// Returns the symbol to resubscribe when the book fell out of sync. The book
/// is already waiting for its snapshot when this returns.
fn track_book_event(
    books: &OrderbookManager,
    resyncs: &mut HashMap<String, PendingResync>,
    event: &BookEvent,
    now: Instant,
) -> Option<String> {
    if event.needs_resync() {
        begin_resync(books, resyncs, &event.key, &event.symbol, now);
        return Some(event.symbol.clone());
    }

    if event.outcome == UpdateOutcome::Replaced && resyncs.remove(&event.key).is_some() {
        info!(key = %event.key, "orderbook resynchronized");
    }
    None
}

/// Mark every book waiting after a reconnect and expect a snapshot for each
/// replayed orderbook subscription
fn track_reconnect(
    books: &OrderbookManager,
    resyncs: &mut HashMap<String, PendingResync>,
    subscriptions: &[Subscription],
    now: Instant,
) {
    for key in books.keys() {
        books.mark_waiting_for_snapshot(&key);
    }
    for subscription in subscriptions {
        if subscription.feed == FeedKind::Orderbook {
            resyncs.insert(
                subscription.key(),
                PendingResync::new(subscription.symbol.as_str(), now),
            );
        }
    }
}

/// Keys whose requested snapshot is overdue, with their symbol
fn stale_resyncs(
    resyncs: &HashMap<String, PendingResync>,
    books: &OrderbookManager,
    now: Instant,
    timeout: Duration,
) -> Vec<(String, String)> {
    resyncs
        .iter()
        .filter(|(key, pending)| books.is_waiting(key) && pending.is_stale(now, timeout))
        .map(|(key, pending)| (key.clone(), pending.symbol.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ORDERBOOK:ETHBTC:";

    fn apply(books: &OrderbookManager, raw: &str) -> BookEvent {
        match WsMessage::parse(raw).unwrap() {
            WsMessage::Notification(n) => books.handle_notification(&n).unwrap(),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    fn snapshot(sequence: u64) -> String {
        serde_json::json!({
            "method": "snapshotOrderbook",
            "params": {
                "symbol": "ETHBTC",
                "sequence": sequence,
                "timestamp": 0,
                "ask": [],
                "bid": []
            }
        })
        .to_string()
    }

    fn delta(from: u64, to: u64) -> String {
        serde_json::json!({
            "method": "updateOrderbook",
            "params": {
                "symbol": "ETHBTC",
                "fromSequence": from,
                "toSequence": to,
                "timestamp": 0,
                "ask": [],
                "bid": []
            }
        })
        .to_string()
    }

    #[test]
    fn test_pending_resync_staleness() {
        let start = Instant::now();
        let pending = PendingResync::new("ETHBTC", start);

        assert!(!pending.is_stale(start, Duration::from_secs(5)));
        assert!(pending.is_stale(start + Duration::from_secs(5), Duration::from_secs(5)));
    }

    #[test]
    fn test_stale_resyncs_only_for_waiting_books() {
        let books = OrderbookManager::new();
        apply(&books, &snapshot(1));
        let event = apply(&books, &delta(3, 4));
        assert!(event.needs_resync());
        books.mark_waiting_for_snapshot(KEY);

        let start = Instant::now();
        let mut resyncs = HashMap::new();
        resyncs.insert(KEY.to_string(), PendingResync::new("ETHBTC", start));

        let timeout = Duration::from_secs(10);
        assert!(stale_resyncs(&resyncs, &books, start, timeout).is_empty());

        let later = start + Duration::from_secs(11);
        assert_eq!(
            stale_resyncs(&resyncs, &books, later, timeout),
            vec![(KEY.to_string(), "ETHBTC".to_string())]
        );

        // Snapshot arrived: no longer overdue
        apply(&books, &snapshot(50));
        assert!(stale_resyncs(&resyncs, &books, later, timeout).is_empty());
    }

    #[test]
    fn test_non_book_notifications_pass_through() {
        let books = OrderbookManager::new();
        let raw = serde_json::json!({
            "method": "ticker",
            "params": {
                "symbol": "ETHBTC",
                "ask": "0.05",
                "bid": "0.04",
                "timestamp": "2021-01-01T00:00:00.000Z"
            }
        });
        let msg = WsMessage::parse(&raw.to_string()).unwrap();

        let WsMessage::Notification(n) = msg else {
            panic!("expected notification");
        };
        assert!(books.handle_notification(&n).is_none());
        assert!(matches!(n, Notification::Ticker { .. }));
    }

    #[test]
    fn test_gap_marks_waiting_and_tracks_resync() {
        let books = OrderbookManager::new();
        let mut resyncs = HashMap::new();
        let start = Instant::now();

        let event = apply(&books, &snapshot(1));
        assert_eq!(track_book_event(&books, &mut resyncs, &event, start), None);
        assert!(resyncs.is_empty());

        let event = apply(&books, &delta(1, 2));
        assert_eq!(track_book_event(&books, &mut resyncs, &event, start), None);

        // Gap: the book must be waiting before the resubscribe goes out
        let event = apply(&books, &delta(7, 8));
        let symbol = track_book_event(&books, &mut resyncs, &event, start);
        assert_eq!(symbol.as_deref(), Some("ETHBTC"));
        assert!(books.is_waiting(KEY));
        assert_eq!(resyncs[KEY].symbol, "ETHBTC");
        assert_eq!(resyncs[KEY].requested_at, start);

        // Deltas while waiting are dropped and keep the resync pending
        let event = apply(&books, &delta(2, 3));
        assert_eq!(event.outcome, UpdateOutcome::Ignored);
        assert_eq!(track_book_event(&books, &mut resyncs, &event, start), None);
        assert!(resyncs.contains_key(KEY));

        let event = apply(&books, &snapshot(40));
        assert_eq!(track_book_event(&books, &mut resyncs, &event, start), None);
        assert!(resyncs.is_empty());
        assert!(!books.is_waiting(KEY));
    }

    #[test]
    fn test_reconnect_schedules_resync_for_replayed_books() {
        let books = OrderbookManager::new();
        apply(&books, &snapshot(1));

        let mut resyncs = HashMap::new();
        let start = Instant::now();
        let subscriptions = vec![
            Subscription::orderbook("ETHBTC"),
            Subscription::trades("ETHBTC", None),
        ];
        track_reconnect(&books, &mut resyncs, &subscriptions, start);

        assert!(books.is_waiting(KEY));
        assert_eq!(resyncs.len(), 1);

        // Replayed snapshot never arrives: the book is retried after the timeout
        let timeout = Duration::from_secs(10);
        assert!(stale_resyncs(&resyncs, &books, start, timeout).is_empty());
        assert_eq!(
            stale_resyncs(&resyncs, &books, start + Duration::from_secs(3600), timeout),
            vec![(KEY.to_string(), "ETHBTC".to_string())]
        );

        // Replayed snapshot arrives: nothing left to retry
        let event = apply(&books, &snapshot(90));
        track_book_event(&books, &mut resyncs, &event, start);
        assert!(resyncs.is_empty());
    }
}
