//! # cryptomarket
//!
//! A Rust client for the CryptoMarket exchange API with a self-healing
//! local orderbook cache.
//!
//! ## Features
//!
//! - **REST API Client** - Market data and trading endpoints
//! - **WebSocket Client** - Real-time orderbooks, trades, candles and tickers
//! - **Orderbook Cache** - Snapshot plus delta reconstruction with sequence
//!   gap detection and automatic resubscription
//! - **Async/Await** - Built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cryptomarket::{Client, Config};
//! use cryptomarket::client::StreamEvent;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cryptomarket::Error> {
//!     let client = Client::new(Config::public())?;
//!
//!     let mut stream = client.market_data_stream().await?;
//!     stream.subscribe_orderbook("ETHBTC").await?;
//!
//!     let books = stream.books();
//!     while let Some(event) = stream.next().await {
//!         if let StreamEvent::Book(event) = event? {
//!             let book = books.get_orderbook(&event.key);
//!             println!("{:?}", book.and_then(|b| b.spread()));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Price Representation
//!
//! Prices and sizes arrive as decimal strings and are held as
//! [`Decimal`], so `"1.50"` and `"1.5"` address the same level and no
//! precision is lost to binary floating point.
//!
//! ## Architecture
//!
//! - [`client`] - REST and WebSocket clients for API communication
//! - [`types`] - Request/response and notification types
//! - [`orderbook`] - Merge, per-key cache and shared manager
//! - [`config`] - Configuration and credentials management
//! - [`error`] - Error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use rust_decimal::Decimal;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The main exchange API client
///
/// This struct provides access to both REST and WebSocket APIs.
///
/// # Example
///
/// ```rust,no_run
/// use cryptomarket::{Client, Config};
/// use cryptomarket::types::{CreateOrderRequest, OrderSide};
/// use cryptomarket::Decimal;
///
/// # async fn example() -> cryptomarket::Result<()> {
/// let client = Client::new(Config::from_env()?)?;
///
/// let balances = client.rest().get_trading_balance().await?;
/// println!("{} currencies", balances.len());
///
/// let order = CreateOrderRequest::limit(
///     "ETHBTC",
///     OrderSide::Buy,
///     Decimal::new(1, 2),
///     Decimal::new(5, 2),
/// );
/// let placed = client.rest().create_order(&order).await?;
/// println!("placed {}", placed.client_order_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    config: Config,
    rest_client: client::rest::RestClient,
}

impl Client {
    /// Create a new client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: Config) -> Result<Self> {
        let rest_client = client::rest::RestClient::new(&config)?;
        Ok(Self {
            config,
            rest_client,
        })
    }

    /// Get a reference to the REST client
    pub fn rest(&self) -> &client::rest::RestClient {
        &self.rest_client
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a WebSocket stream that maintains local orderbooks
    pub async fn market_data_stream(&self) -> Result<client::stream::MarketDataStream> {
        client::stream::MarketDataStream::connect(self.config.clone()).await
    }
}
