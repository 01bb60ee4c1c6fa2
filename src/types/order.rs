//! Order-related types.
//!
//! This module contains types for creating, managing, and representing orders
//! and trading balances on the exchange.

use serde::{Deserialize, Serialize};

use super::{Price, Size};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy the base currency
    Buy,
    /// Sell the base currency
    Sell,
}

impl OrderSide {
    /// Get the opposite side
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Order accepted and resting
    New,
    /// Stop order waiting for its trigger
    Suspended,
    /// Order partially executed
    PartiallyFilled,
    /// Order fully executed
    Filled,
    /// Order canceled
    Canceled,
    /// Order expired
    Expired,
}

impl OrderStatus {
    /// Whether the order can still trade
    pub fn is_open(self) -> bool {
        matches!(
            self,
            OrderStatus::New | OrderStatus::Suspended | OrderStatus::PartiallyFilled
        )
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    /// Limit order - specify price and quantity
    #[default]
    Limit,
    /// Market order - execute at best available price
    Market,
    /// Limit order placed once the stop price is reached
    StopLimit,
    /// Market order placed once the stop price is reached
    StopMarket,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till canceled
    #[serde(rename = "GTC")]
    GoodTillCanceled,
    /// Immediate or cancel
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Fill or kill
    #[serde(rename = "FOK")]
    FillOrKill,
    /// Good for the trading day
    Day,
    /// Good till the given expire time
    #[serde(rename = "GTD")]
    GoodTillDate,
}

/// Request to create a new order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Symbol to trade
    pub symbol: String,

    /// Client-generated order ID (optional, for idempotency)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,

    /// Order side
    pub side: OrderSide,

    /// Order type
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Order quantity
    pub quantity: Size,

    /// Limit price (required for limit orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,

    /// Trigger price for stop orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Price>,

    /// Time in force
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,

    /// Reject the order if it would take liquidity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_only: Option<bool>,
}

impl CreateOrderRequest {
    /// Create a new limit order request
    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: Size, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            client_order_id: None,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: None,
            post_only: None,
        }
    }

    /// Create a new market order request
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Size) -> Self {
        Self {
            symbol: symbol.into(),
            client_order_id: None,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            post_only: None,
        }
    }

    /// Set a client order ID for idempotency
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Set the time in force
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    /// Only accept the order as a maker
    pub fn post_only(mut self) -> Self {
        self.post_only = Some(true);
        self
    }
}

/// An order on the exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server-generated order ID
    pub id: u64,

    /// Client order ID
    pub client_order_id: String,

    /// Symbol
    pub symbol: String,

    /// Order side
    pub side: OrderSide,

    /// Order status
    pub status: OrderStatus,

    /// Order type
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Time in force
    pub time_in_force: TimeInForce,

    /// Order quantity
    pub quantity: Size,

    /// Limit price
    pub price: Option<Price>,

    /// Executed quantity so far
    pub cum_quantity: Size,

    /// Creation time (ISO 8601)
    pub created_at: String,

    /// Last update time (ISO 8601)
    pub updated_at: String,
}

impl Order {
    /// Quantity still open
    pub fn remaining_quantity(&self) -> Size {
        self.quantity - self.cum_quantity
    }
}

/// Balance of one currency in the trading account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Balance {
    /// Currency code
    pub currency: String,
    /// Amount available for trading
    pub available: Size,
    /// Amount reserved by open orders
    pub reserved: Size,
}
