//! API types for CryptoMarket requests, responses and stream notifications.
//!
//! - [`level`] - Price levels (decimal price/size pairs)
//! - [`orderbook`] - Orderbook snapshot and delta payloads
//! - [`market`] - Symbols, tickers, trades and candles
//! - [`order`] - Order and balance types
//! - [`messages`] - WebSocket requests, responses and notifications

pub mod level;
pub mod market;
pub mod messages;
pub mod order;
pub mod orderbook;

pub use level::PriceLevel;
pub use market::{Candle, Period, PublicTrade, Symbol, Ticker};
pub use messages::{FeedKind, MethodKind, Notification, WsMessage};
pub use order::{Balance, CreateOrderRequest, Order, OrderSide, OrderStatus, OrderType};
pub use orderbook::{BookUpdate, OrderbookDelta, OrderbookSnapshot, Timestamp};

/// Price as an exact decimal.
///
/// The exchange sends prices as arbitrary-precision decimal strings, so
/// binary floating point is never used for comparisons.
pub type Price = rust_decimal::Decimal;

/// Size (aggregate quantity) as an exact decimal.
pub type Size = rust_decimal::Decimal;
