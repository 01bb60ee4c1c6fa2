//! WebSocket client for real-time market data.
//!
//! This module provides the [`WebSocketClient`] for streaming:
//!
//! - Orderbook snapshots and deltas
//! - Public trades
//! - Candles
//! - Tickers
//!
//! and [`ReconnectingWebSocket`], which reconnects with exponential backoff
//! and replays login and subscriptions on the new connection.
//!
//! Requests are correlated with their responses by a per-connection request
//! ID. Subscriptions are tracked by their routing key
//! (see [`subscription_key`]).

use std::collections::HashMap;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::Error;
use crate::types::market::Period;
use crate::types::messages::{subscription_key, FeedKind, WsMessage, WsRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One feed subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Feed kind
    pub feed: FeedKind,
    /// Symbol
    pub symbol: String,
    /// Candle period (candles only)
    pub period: Option<Period>,
    /// Number of items in the initial snapshot (trades and candles only)
    pub limit: Option<u32>,
}

impl Subscription {
    /// Orderbook subscription
    pub fn orderbook(symbol: impl Into<String>) -> Self {
        Self {
            feed: FeedKind::Orderbook,
            symbol: symbol.into(),
            period: None,
            limit: None,
        }
    }

    /// Public trades subscription
    pub fn trades(symbol: impl Into<String>, limit: Option<u32>) -> Self {
        Self {
            feed: FeedKind::Trades,
            symbol: symbol.into(),
            period: None,
            limit,
        }
    }

    /// Candles subscription
    pub fn candles(symbol: impl Into<String>, period: Period, limit: Option<u32>) -> Self {
        Self {
            feed: FeedKind::Candles,
            symbol: symbol.into(),
            period: Some(period),
            limit,
        }
    }

    /// Ticker subscription
    pub fn ticker(symbol: impl Into<String>) -> Self {
        Self {
            feed: FeedKind::Ticker,
            symbol: symbol.into(),
            period: None,
            limit: None,
        }
    }

    /// Routing key of the notifications this subscription produces
    pub fn key(&self) -> String {
        subscription_key(self.feed, &self.symbol, self.period)
    }

    fn params(&self) -> Value {
        let mut params = json!({ "symbol": self.symbol });
        if let Some(period) = self.period {
            params["period"] = json!(period.as_str());
        }
        if let Some(limit) = self.limit {
            params["limit"] = json!(limit);
        }
        params
    }
}

/// What a pending request was for
#[derive(Debug, Clone)]
enum PendingRequest {
    Subscribe(Subscription),
    Unsubscribe(String),
    Login,
}

/// WebSocket client for real-time market data
///
/// Tracks confirmed subscriptions by routing key, so a subscription is only
/// considered active once the server has answered its request successfully.
///
/// # Thread Safety
///
/// This client is NOT thread-safe. For concurrent access from multiple tasks,
/// use channels or wrap in a mutex.
#[derive(Debug)]
pub struct WebSocketClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    next_id: u64,
    /// Confirmed subscriptions by routing key
    subscriptions: HashMap<String, Subscription>,
    /// Requests awaiting a response, by request id
    pending: HashMap<u64, PendingRequest>,
}

impl WebSocketClient {
    /// Connect to the WebSocket API
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(config.websocket_url()).await?;
        let (write, read) = ws_stream.split();
        info!(url = config.websocket_url(), "WebSocket connected");

        Ok(Self {
            write,
            read,
            next_id: 1,
            subscriptions: HashMap::new(),
            pending: HashMap::new(),
        })
    }

    /// Send a request and return its ID
    pub async fn send_request(&mut self, method: &str, params: Value) -> Result<u64, Error> {
        let id = self.next_id;
        self.next_id += 1;

        let json = serde_json::to_string(&WsRequest::new(id, method, params))?;
        debug!(id, method, "WebSocket request");
        self.write.send(Message::Text(json)).await?;
        Ok(id)
    }

    /// Get the next request ID without incrementing
    pub fn next_request_id(&self) -> u64 {
        self.next_id
    }

    /// Get all confirmed subscriptions
    pub fn subscriptions(&self) -> &HashMap<String, Subscription> {
        &self.subscriptions
    }

    /// Whether the subscription with routing key `key` is confirmed
    pub fn is_subscribed(&self, key: &str) -> bool {
        self.subscriptions.contains_key(key)
    }

    /// Subscribe to a feed
    ///
    /// # Returns
    ///
    /// The request ID (use to correlate with the response)
    pub async fn subscribe(&mut self, subscription: Subscription) -> Result<u64, Error> {
        let method = subscription
            .feed
            .subscribe_method()
            .ok_or_else(|| {
                Error::Config(format!("cannot subscribe to {} feed", subscription.feed))
            })?;

        let id = self.send_request(method, subscription.params()).await?;
        self.pending.insert(id, PendingRequest::Subscribe(subscription));
        Ok(id)
    }

    /// Unsubscribe from a feed
    pub async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<u64, Error> {
        let method = subscription
            .feed
            .unsubscribe_method()
            .ok_or_else(|| {
                Error::Config(format!("cannot unsubscribe from {} feed", subscription.feed))
            })?;

        let id = self.send_request(method, subscription.params()).await?;
        self.pending
            .insert(id, PendingRequest::Unsubscribe(subscription.key()));
        Ok(id)
    }

    /// Subscribe to orderbook updates for a symbol
    pub async fn subscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.subscribe(Subscription::orderbook(symbol)).await
    }

    /// Request the orderbook subscription again, which makes the server
    /// send a fresh snapshot for `symbol`
    pub async fn resubscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.subscribe_orderbook(symbol).await
    }

    /// Unsubscribe from orderbook updates for a symbol
    pub async fn unsubscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.unsubscribe(&Subscription::orderbook(symbol)).await
    }

    /// Subscribe to public trades
    pub async fn subscribe_trades(
        &mut self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.subscribe(Subscription::trades(symbol, limit)).await
    }

    /// Unsubscribe from public trades
    pub async fn unsubscribe_trades(&mut self, symbol: &str) -> Result<u64, Error> {
        self.unsubscribe(&Subscription::trades(symbol, None)).await
    }

    /// Subscribe to candles
    pub async fn subscribe_candles(
        &mut self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.subscribe(Subscription::candles(symbol, period, limit)).await
    }

    /// Unsubscribe from candles
    pub async fn unsubscribe_candles(
        &mut self,
        symbol: &str,
        period: Period,
    ) -> Result<u64, Error> {
        self.unsubscribe(&Subscription::candles(symbol, period, None)).await
    }

    /// Subscribe to ticker updates
    pub async fn subscribe_ticker(&mut self, symbol: &str) -> Result<u64, Error> {
        self.subscribe(Subscription::ticker(symbol)).await
    }

    /// Unsubscribe from ticker updates
    pub async fn unsubscribe_ticker(&mut self, symbol: &str) -> Result<u64, Error> {
        self.unsubscribe(&Subscription::ticker(symbol)).await
    }

    /// Authenticate the session
    pub async fn login(&mut self, signer: &Signer) -> Result<u64, Error> {
        let params = serde_json::to_value(signer.login_params())?;
        let id = self.send_request("login", params).await?;
        self.pending.insert(id, PendingRequest::Login);
        Ok(id)
    }

    /// Receive the next message from the WebSocket
    ///
    /// This method also answers pings and tracks subscription state:
    /// a successful subscribe response activates the subscription, a
    /// successful unsubscribe response removes it.
    ///
    /// # Returns
    ///
    /// The next message, or `None` if the stream has ended.
    pub async fn next(&mut self) -> Option<Result<WsMessage, Error>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => {
                    let msg = match WsMessage::parse(&text) {
                        Ok(msg) => msg,
                        Err(e) => return Some(Err(e)),
                    };
                    self.handle_response_tracking(&msg);
                    return Some(Ok(msg));
                }
                Ok(Message::Ping(data)) => {
                    // Respond to pings automatically
                    if let Err(e) = self.write.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "WebSocket closed by server");
                    return Some(Err(Error::ConnectionClosed));
                }
                Ok(_) => {
                    // Ignore other message types (Binary, Pong, Frame)
                    continue;
                }
                Err(e) => {
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Update subscription state from a response
    fn handle_response_tracking(&mut self, msg: &WsMessage) {
        let WsMessage::Response { id: Some(id), result } = msg else {
            return;
        };
        let Some(pending) = self.pending.remove(id) else {
            return;
        };

        match (pending, result) {
            (PendingRequest::Subscribe(subscription), Ok(_)) => {
                debug!(key = %subscription.key(), "subscription confirmed");
                self.subscriptions.insert(subscription.key(), subscription);
            }
            (PendingRequest::Unsubscribe(key), Ok(_)) => {
                debug!(key = %key, "subscription removed");
                self.subscriptions.remove(&key);
            }
            (PendingRequest::Login, Ok(_)) => {
                info!("WebSocket session authenticated");
            }
            (pending, Err(error)) => {
                warn!(id, ?pending, %error, "WebSocket request failed");
            }
        }
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) -> Result<(), Error> {
        self.write.close().await?;
        Ok(())
    }
}

/// WebSocket client with automatic reconnection support.
///
/// This wrapper around [`WebSocketClient`] provides:
/// - Automatic reconnection with exponential backoff
/// - Login and subscription replay after reconnection
/// - Connection state tracking
///
/// # Example
///
/// ```rust,no_run
/// use cryptomarket::Config;
/// use cryptomarket::client::websocket::ReconnectingWebSocket;
///
/// # async fn example() -> cryptomarket::Result<()> {
/// let mut ws = ReconnectingWebSocket::connect(Config::public()).await?;
///
/// // Subscribe - will be automatically replayed on reconnection
/// ws.subscribe_orderbook("ETHBTC").await?;
///
/// while let Some(msg) = ws.next().await {
///     match msg {
///         Ok(msg) => println!("{:?}", msg),
///         Err(e) => eprintln!("Error: {}", e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReconnectingWebSocket {
    /// The underlying WebSocket client
    client: Option<WebSocketClient>,
    /// Configuration for API connection
    config: Config,
    /// Session signer, replayed after reconnection when set
    signer: Option<Signer>,
    /// Subscriptions to replay after reconnection
    subscription_requests: Vec<Subscription>,
    /// Current reconnection attempt
    reconnect_attempt: u32,
    /// Whether we're currently trying to reconnect
    is_reconnecting: bool,
    /// Number of successful connections so far
    connection_count: u64,
}

impl std::fmt::Debug for ReconnectingWebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingWebSocket")
            .field("connected", &self.client.is_some())
            .field("reconnect_attempt", &self.reconnect_attempt)
            .field("is_reconnecting", &self.is_reconnecting)
            .field("connection_count", &self.connection_count)
            .field("subscription_count", &self.subscription_requests.len())
            .finish()
    }
}

impl ReconnectingWebSocket {
    /// Connect to the WebSocket API with reconnection support
    pub async fn connect(config: Config) -> Result<Self, Error> {
        let client = WebSocketClient::connect(&config).await?;

        Ok(Self {
            client: Some(client),
            config,
            signer: None,
            subscription_requests: Vec::new(),
            reconnect_attempt: 0,
            is_reconnecting: false,
            connection_count: 1,
        })
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Check if currently reconnecting
    pub fn is_reconnecting(&self) -> bool {
        self.is_reconnecting
    }

    /// Get the current reconnection attempt number
    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    /// Number of successful connections, including the first one
    pub fn connection_count(&self) -> u64 {
        self.connection_count
    }

    /// Get confirmed subscriptions (if connected)
    pub fn subscriptions(&self) -> Option<&HashMap<String, Subscription>> {
        self.client.as_ref().map(|c| c.subscriptions())
    }

    fn client_mut(&mut self) -> Result<&mut WebSocketClient, Error> {
        self.client.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Authenticate the session with the configured credentials
    ///
    /// The login is replayed after every reconnection.
    pub async fn login(&mut self) -> Result<u64, Error> {
        let signer = self
            .config
            .credentials()
            .map(Signer::from_credentials)
            .ok_or_else(|| Error::Authentication("no API credentials configured".to_string()))?;

        let id = self.client_mut()?.login(&signer).await?;
        self.signer = Some(signer);
        Ok(id)
    }

    /// Subscribe to a feed
    ///
    /// The subscription will be automatically replayed if the connection is lost.
    pub async fn subscribe(&mut self, subscription: Subscription) -> Result<u64, Error> {
        if !self.subscription_requests.contains(&subscription) {
            self.subscription_requests.push(subscription.clone());
        }
        self.client_mut()?.subscribe(subscription).await
    }

    /// Unsubscribe from a feed; it will no longer be replayed
    pub async fn unsubscribe(&mut self, subscription: &Subscription) -> Result<u64, Error> {
        let key = subscription.key();
        self.subscription_requests.retain(|s| s.key() != key);
        self.client_mut()?.unsubscribe(subscription).await
    }

    /// Subscribe to orderbook updates
    pub async fn subscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.subscribe(Subscription::orderbook(symbol)).await
    }

    /// Request a fresh orderbook snapshot by subscribing again.
    ///
    /// Does not add a second entry to the replay list.
    pub async fn resubscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.client_mut()?.resubscribe_orderbook(symbol).await
    }

    /// Unsubscribe from orderbook updates
    pub async fn unsubscribe_orderbook(&mut self, symbol: &str) -> Result<u64, Error> {
        self.unsubscribe(&Subscription::orderbook(symbol)).await
    }

    /// Subscribe to public trades
    pub async fn subscribe_trades(
        &mut self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.subscribe(Subscription::trades(symbol, limit)).await
    }

    /// Subscribe to candles
    pub async fn subscribe_candles(
        &mut self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<u64, Error> {
        self.subscribe(Subscription::candles(symbol, period, limit)).await
    }

    /// Subscribe to ticker updates
    pub async fn subscribe_ticker(&mut self, symbol: &str) -> Result<u64, Error> {
        self.subscribe(Subscription::ticker(symbol)).await
    }

    /// Subscriptions that will be replayed on reconnection
    pub fn saved_subscriptions(&self) -> &[Subscription] {
        &self.subscription_requests
    }

    /// Clear all saved subscriptions
    ///
    /// Subscriptions will no longer be replayed on reconnection.
    pub fn clear_subscriptions(&mut self) {
        self.subscription_requests.clear();
    }

    /// Receive the next message, reconnecting if necessary
    ///
    /// This method will automatically attempt to reconnect if the connection
    /// is lost, replaying login and all subscriptions after successful
    /// reconnection.
    pub async fn next(&mut self) -> Option<Result<WsMessage, Error>> {
        loop {
            if let Some(ref mut client) = self.client {
                match client.next().await {
                    Some(Ok(msg)) => {
                        self.reconnect_attempt = 0; // Reset on successful message
                        return Some(Ok(msg));
                    }
                    Some(Err(Error::ConnectionClosed)) | Some(Err(Error::WebSocket(_))) | None => {
                        warn!("WebSocket connection lost, reconnecting");
                        self.client = None;
                        if let Err(e) = self.attempt_reconnect().await {
                            return Some(Err(e));
                        }
                        // Continue loop to receive from new connection
                        continue;
                    }
                    Some(Err(e)) => {
                        return Some(Err(e));
                    }
                }
            } else {
                // Not connected, attempt reconnection
                if let Err(e) = self.attempt_reconnect().await {
                    return Some(Err(e));
                }
            }
        }
    }

    /// Attempt to reconnect with exponential backoff
    async fn attempt_reconnect(&mut self) -> Result<(), Error> {
        self.is_reconnecting = true;

        loop {
            let max_retries = self.config.reconnect().max_retries;
            if max_retries > 0 && self.reconnect_attempt >= max_retries {
                warn!(attempts = self.reconnect_attempt, "giving up reconnecting");
                self.is_reconnecting = false;
                return Err(Error::ConnectionClosed);
            }

            let delay = self.config.reconnect().delay_for_attempt(self.reconnect_attempt);
            tokio::time::sleep(delay).await;

            self.reconnect_attempt += 1;

            match WebSocketClient::connect(&self.config).await {
                Ok(mut client) => {
                    if let Err(e) = self.replay(&mut client).await {
                        warn!(error = %e, "failed to replay subscriptions");
                        continue;
                    }

                    self.client = Some(client);
                    self.is_reconnecting = false;
                    self.connection_count += 1;
                    info!(
                        attempt = self.reconnect_attempt,
                        subscriptions = self.subscription_requests.len(),
                        "WebSocket reconnected"
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt = self.reconnect_attempt, error = %e, "reconnect failed");
                    continue;
                }
            }
        }
    }

    /// Replay login and all saved subscriptions on a new connection
    async fn replay(&self, client: &mut WebSocketClient) -> Result<(), Error> {
        if let Some(signer) = &self.signer {
            client.login(signer).await?;
        }
        for subscription in &self.subscription_requests {
            client.subscribe(subscription.clone()).await?;
        }
        Ok(())
    }

    /// Manually trigger a reconnection
    ///
    /// Useful if you want to force a reconnect without waiting for an error.
    pub async fn reconnect(&mut self) -> Result<(), Error> {
        if let Some(ref mut client) = self.client {
            let _ = client.close().await;
        }
        self.client = None;
        self.reconnect_attempt = 0;
        self.attempt_reconnect().await
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) -> Result<(), Error> {
        if let Some(ref mut client) = self.client {
            client.close().await?;
        }
        self.client = None;
        Ok(())
    }
}
