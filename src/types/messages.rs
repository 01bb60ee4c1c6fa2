//! WebSocket message types.
//!
//! The WebSocket API speaks a JSON-RPC flavoured protocol:
//!
//! - Requests carry `method`, `params` and an `id`.
//! - Responses echo the `id` with either a `result` or an `error`.
//! - Notifications carry a `method` (e.g. `snapshotOrderbook`) and `params`,
//!   with no `id`.
//!
//! Notification method names are resolved once, at decoding time, into a
//! closed [`FeedKind`] / [`MethodKind`] pair and a typed [`Notification`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::market::{Candle, Period, PublicTrade, Ticker};
use super::orderbook::{BookUpdate, OrderbookDelta, OrderbookSnapshot};
use crate::error::Error;

/// Kind of market data feed a notification belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Orderbook snapshots and deltas
    Orderbook,
    /// Public trades
    Trades,
    /// OHLCV candles
    Candles,
    /// 24h ticker
    Ticker,
    /// Anything else (reports, balances, unknown methods)
    Other,
}

impl FeedKind {
    /// Resolve a notification method name into its feed and method kind.
    ///
    /// Unknown methods map to `(FeedKind::Other, None)`.
    pub fn from_method(method: &str) -> (FeedKind, Option<MethodKind>) {
        match method {
            "snapshotOrderbook" => (FeedKind::Orderbook, Some(MethodKind::Snapshot)),
            "updateOrderbook" => (FeedKind::Orderbook, Some(MethodKind::Update)),
            "snapshotTrades" => (FeedKind::Trades, Some(MethodKind::Snapshot)),
            "updateTrades" => (FeedKind::Trades, Some(MethodKind::Update)),
            "snapshotCandles" => (FeedKind::Candles, Some(MethodKind::Snapshot)),
            "updateCandles" => (FeedKind::Candles, Some(MethodKind::Update)),
            "ticker" => (FeedKind::Ticker, Some(MethodKind::Update)),
            _ => (FeedKind::Other, None),
        }
    }

    /// Lowercase feed name used in subscription keys
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Orderbook => "orderbook",
            FeedKind::Trades => "trades",
            FeedKind::Candles => "candles",
            FeedKind::Ticker => "ticker",
            FeedKind::Other => "other",
        }
    }

    /// Subscribe method name for this feed
    pub fn subscribe_method(&self) -> Option<&'static str> {
        match self {
            FeedKind::Orderbook => Some("subscribeOrderbook"),
            FeedKind::Trades => Some("subscribeTrades"),
            FeedKind::Candles => Some("subscribeCandles"),
            FeedKind::Ticker => Some("subscribeTicker"),
            FeedKind::Other => None,
        }
    }

    /// Unsubscribe method name for this feed
    pub fn unsubscribe_method(&self) -> Option<&'static str> {
        match self {
            FeedKind::Orderbook => Some("unsubscribeOrderbook"),
            FeedKind::Trades => Some("unsubscribeTrades"),
            FeedKind::Candles => Some("unsubscribeCandles"),
            FeedKind::Ticker => Some("unsubscribeTicker"),
            FeedKind::Other => None,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a notification carries a full state or an incremental change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Full state
    Snapshot,
    /// Incremental change
    Update,
}

/// Build the routing key of one logical feed.
///
/// The key is `{feed}:{symbol}:{period-or-empty}`, uppercased, so
/// `("orderbook", "ethbtc", None)` becomes `ORDERBOOK:ETHBTC:`.
pub fn subscription_key(feed: FeedKind, symbol: &str, period: Option<Period>) -> String {
    let period = period.map(|p| p.as_str()).unwrap_or("");
    format!("{}:{}:{}", feed.as_str(), symbol, period).to_uppercase()
}

/// Request sent to the server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsRequest {
    /// Method name (e.g. `subscribeOrderbook`)
    pub method: String,
    /// Method parameters
    pub params: Value,
    /// Request ID, echoed in the response
    pub id: u64,
}

impl WsRequest {
    /// Create a new request
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object of a failed request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    /// Error code
    pub code: i64,
    /// Short message
    pub message: String,
    /// Longer explanation, when provided
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({}): {}", self.message, self.code, description),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

/// Any frame the server may send, before classification
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Message received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Response to a request we sent
    Response {
        /// Request ID (absent for some protocol-level errors)
        id: Option<u64>,
        /// `result` on success, `error` on failure
        result: Result<Value, RpcError>,
    },
    /// Server-pushed notification
    Notification(Notification),
}

impl WsMessage {
    /// Parse a text frame
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is not valid JSON or a known
    /// notification has a malformed payload.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let frame: RawFrame = serde_json::from_str(text)?;

        if let Some(method) = frame.method {
            let params = frame.params.unwrap_or(Value::Null);
            return Ok(WsMessage::Notification(Notification::decode(method, params)?));
        }

        let result = match frame.error {
            Some(error) => Err(error),
            None => Ok(frame.result.unwrap_or(Value::Null)),
        };
        Ok(WsMessage::Response {
            id: frame.id,
            result,
        })
    }

    /// Result of a response, with a server error mapped to [`Error::Rpc`].
    ///
    /// Returns `None` for notifications.
    pub fn into_result(self) -> Option<Result<Value, Error>> {
        match self {
            WsMessage::Response { id, result } => {
                Some(result.map_err(|error| Error::Rpc { id, error }))
            }
            WsMessage::Notification(_) => None,
        }
    }
}

/// `params` of trade notifications
#[derive(Debug, Deserialize)]
struct TradesParams {
    symbol: String,
    #[serde(default)]
    data: Vec<PublicTrade>,
}

/// `params` of candle notifications
#[derive(Debug, Deserialize)]
struct CandlesParams {
    symbol: String,
    period: Period,
    #[serde(default)]
    data: Vec<Candle>,
}

/// A decoded server notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Orderbook snapshot or delta
    Orderbook {
        /// Routing key of the book
        key: String,
        /// The snapshot or delta
        update: BookUpdate,
    },
    /// Public trades
    Trades {
        /// Routing key of the feed
        key: String,
        /// Snapshot or update
        kind: MethodKind,
        /// Symbol
        symbol: String,
        /// Trades, oldest first
        data: Vec<PublicTrade>,
    },
    /// Candles
    Candles {
        /// Routing key of the feed
        key: String,
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
    Ticker {
        /// Routing key of the feed
        key: String,
        /// Ticker data
        ticker: Ticker,
    },
    /// Notification this crate does not interpret
    Other {
        /// Method name
        method: String,
        /// Raw parameters
        params: Value,
    },
}

impl Notification {
    /// Decode a notification from its method name and raw parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the parameters of a known method do not
    /// match its payload shape.
    pub fn decode(method: String, params: Value) -> Result<Self, Error> {
        let (feed, kind) = FeedKind::from_method(&method);

        let notification = match (feed, kind) {
            (FeedKind::Orderbook, Some(MethodKind::Snapshot)) => {
                let snapshot: OrderbookSnapshot = serde_json::from_value(params)?;
                Notification::Orderbook {
                    key: subscription_key(feed, &snapshot.symbol, None),
                    update: BookUpdate::Snapshot(snapshot),
                }
            }
            (FeedKind::Orderbook, Some(MethodKind::Update)) => {
                let delta: OrderbookDelta = serde_json::from_value(params)?;
                Notification::Orderbook {
                    key: subscription_key(feed, &delta.symbol, None),
                    update: BookUpdate::Delta(delta),
                }
            }
            (FeedKind::Trades, Some(kind)) => {
                let p: TradesParams = serde_json::from_value(params)?;
                Notification::Trades {
                    key: subscription_key(feed, &p.symbol, None),
                    kind,
                    symbol: p.symbol,
                    data: p.data,
                }
            }
            (FeedKind::Candles, Some(kind)) => {
                let p: CandlesParams = serde_json::from_value(params)?;
                Notification::Candles {
                    key: subscription_key(feed, &p.symbol, Some(p.period)),
                    kind,
                    symbol: p.symbol,
                    period: p.period,
                    data: p.data,
                }
            }
            (FeedKind::Ticker, _) => {
                let ticker: Ticker = serde_json::from_value(params)?;
                Notification::Ticker {
                    key: subscription_key(feed, &ticker.symbol, None),
                    ticker,
                }
            }
            _ => Notification::Other { method, params },
        };

        Ok(notification)
    }

    /// Feed this notification belongs to
    pub fn feed(&self) -> FeedKind {
        match self {
            Notification::Orderbook { .. } => FeedKind::Orderbook,
            Notification::Trades { .. } => FeedKind::Trades,
            Notification::Candles { .. } => FeedKind::Candles,
            Notification::Ticker { .. } => FeedKind::Ticker,
            Notification::Other { .. } => FeedKind::Other,
        }
    }

    /// Routing key, if the notification belongs to a subscription feed
    pub fn key(&self) -> Option<&str> {
        match self {
            Notification::Orderbook { key, .. }
            | Notification::Trades { key, .. }
            | Notification::Candles { key, .. }
            | Notification::Ticker { key, .. } => Some(key),
            Notification::Other { .. } => None,
        }
    }
}
