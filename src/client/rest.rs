//! HTTP REST client for the exchange API.
//!
//! This module provides the [`RestClient`] for public market data and
//! authenticated trading endpoints.
//!
//! # Example
//!
//! ```rust,no_run
//! use cryptomarket::{Config, Client};
//!
//! # async fn example() -> cryptomarket::Result<()> {
//! let client = Client::new(Config::public())?;
//!
//! let snapshot = client.rest().get_orderbook("ETHBTC", Some(20)).await?;
//! println!("Best ask: {:?}", snapshot.ask.first());
//! # Ok(())
//! # }
//! ```

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::auth::Signer;
use crate::config::Config;
use crate::error::{ApiError, Error};
use crate::types::{
    Balance, Candle, CreateOrderRequest, Order, OrderbookSnapshot, Period, PublicTrade, Symbol,
    Ticker,
};

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    code: Option<i64>,
    message: String,
    description: Option<String>,
}

/// HTTP client for the exchange REST API
#[derive(Debug)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    signer: Option<Signer>,
}

impl RestClient {
    /// Create a new REST client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        // Trailing slash so `join` keeps the `/api/2` prefix
        let base_url = Url::parse(&format!("{}/", config.rest_base_url()))?;

        Ok(Self {
            client,
            base_url,
            signer: config.credentials().map(Signer::from_credentials),
        })
    }

    /// Whether credentials are configured
    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, Error> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Build authentication headers for a request
    fn auth_headers(&self, method: &Method, url: &Url, body: &str) -> Result<HeaderMap, Error> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::Authentication("no API credentials configured".to_string()))?;

        let mut path_and_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        let timestamp = Signer::current_timestamp_ms();
        let authorization = signer.authorization(method.as_str(), &path_and_query, body, timestamp);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization)
                .map_err(|e| Error::Authentication(e.to_string()))?,
        );
        Ok(headers)
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
        authenticated: bool,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path, query)?;
        let body = body.unwrap_or_default();

        let mut request = self.client.request(method.clone(), url.clone());
        if authenticated {
            request = request.headers(self.auth_headers(&method, &url, &body)?);
        }
        if !body.is_empty() {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body);
        }

        debug!(%method, %url, "REST request");
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Make a GET request to a public endpoint
    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, query, None, false).await
    }

    /// Make an authenticated GET request
    pub async fn get_private<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, query, None, true).await
    }

    /// Make an authenticated POST request
    ///
    /// # Arguments
    ///
    /// * `path` - API path (without base URL)
    /// * `body` - Request body to serialize as JSON
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let body = serde_json::to_string(body)?;
        self.request(Method::POST, path, &[], Some(body), true).await
    }

    /// Make an authenticated DELETE request
    pub async fn delete<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, query, None, true).await
    }

    /// Handle the HTTP response, checking for errors
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        // Check for rate limiting
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);

            return Err(Error::RateLimited { retry_after_ms });
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(parse_api_error(status.as_u16(), &body)));
        }

        serde_json::from_str(&body).map_err(Error::from)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// List all tradable symbols
    pub async fn get_symbols(&self) -> Result<Vec<Symbol>, Error> {
        self.get("public/symbol", &[]).await
    }

    /// Get one symbol
    pub async fn get_symbol(&self, symbol: &str) -> Result<Symbol, Error> {
        self.get(&format!("public/symbol/{}", symbol), &[]).await
    }

    /// Get the 24h ticker of one symbol
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker, Error> {
        self.get(&format!("public/ticker/{}", symbol), &[]).await
    }

    /// Get an orderbook snapshot
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol identifier
    /// * `limit` - Levels per side (`None` for the server default, `Some(0)` for full depth)
    pub async fn get_orderbook(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<OrderbookSnapshot, Error> {
        let query: Vec<(&str, String)> =
            limit.map(|l| ("limit", l.to_string())).into_iter().collect();
        let mut snapshot: OrderbookSnapshot = self
            .get(&format!("public/orderbook/{}", symbol), &query)
            .await?;
        if snapshot.symbol.is_empty() {
            snapshot.symbol = symbol.to_string();
        }
        Ok(snapshot)
    }

    /// Get recent public trades, newest first
    pub async fn get_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<Vec<PublicTrade>, Error> {
        let query: Vec<(&str, String)> =
            limit.map(|l| ("limit", l.to_string())).into_iter().collect();
        self.get(&format!("public/trades/{}", symbol), &query).await
    }

    /// Get candles for a symbol
    pub async fn get_candles(
        &self,
        symbol: &str,
        period: Period,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>, Error> {
        let mut query = vec![("period", period.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get(&format!("public/candles/{}", symbol), &query).await
    }

    /// Get trading account balances
    pub async fn get_trading_balance(&self) -> Result<Vec<Balance>, Error> {
        self.get_private("trading/balance", &[]).await
    }

    /// Get open orders, optionally for one symbol
    pub async fn get_active_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, Error> {
        let query: Vec<(&str, String)> =
            symbol.map(|s| ("symbol", s.to_string())).into_iter().collect();
        self.get_private("order", &query).await
    }

    /// Place a new order
    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<Order, Error> {
        self.post("order", order).await
    }

    /// Cancel an order by client order ID
    pub async fn cancel_order(&self, client_order_id: &str) -> Result<Order, Error> {
        self.delete(&format!("order/{}", client_order_id), &[]).await
    }
}

/// Turn an error body into an [`ApiError`], falling back to the raw text
fn parse_api_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ApiError {
            status,
            code: parsed.error.code,
            message: parsed.error.message,
            description: parsed.error.description,
        },
        Err(_) => ApiError::new(status, body),
    }
}
