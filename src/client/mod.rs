//! API clients for communicating with the exchange.
//!
//! This module contains:
//!
//! - [`rest`] - HTTP client for REST API endpoints
//! - [`websocket`] - WebSocket client for real-time data
//! - [`stream`] - WebSocket stream that maintains local orderbooks
//! - [`auth`] - HMAC-SHA256 authentication utilities

pub mod auth;
pub mod rest;
pub mod stream;
pub mod websocket;

pub use auth::Signer;
pub use rest::RestClient;
pub use stream::{MarketDataStream, StreamEvent};
pub use websocket::{ReconnectingWebSocket, Subscription, WebSocketClient};
