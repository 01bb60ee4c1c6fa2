//! Market data types.
//!
//! This module contains types representing symbols, tickers, public trades
//! and candles. They are pure data shapes shared by the REST client and the
//! WebSocket notifications.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;
use super::{Price, Size};

/// A tradable symbol (currency pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Symbol identifier (e.g. "ETHBTC")
    pub id: String,
    /// Base currency code
    pub base_currency: String,
    /// Quote currency code
    pub quote_currency: String,
    /// Minimum quantity increment
    pub quantity_increment: Decimal,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Taker fee rate
    pub take_liquidity_rate: Decimal,
    /// Maker fee rate
    pub provide_liquidity_rate: Decimal,
    /// Currency the fee is charged in
    pub fee_currency: String,
}

/// 24h ticker for a symbol
///
/// Every price field is optional: the exchange sends `null` for symbols
/// with no recent activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Symbol identifier
    pub symbol: String,
    /// Best ask price
    pub ask: Option<Price>,
    /// Best bid price
    pub bid: Option<Price>,
    /// Last trade price
    pub last: Option<Price>,
    /// Price 24h ago
    pub open: Option<Price>,
    /// Lowest price over 24h
    pub low: Option<Price>,
    /// Highest price over 24h
    pub high: Option<Price>,
    /// Base currency volume over 24h
    pub volume: Option<Size>,
    /// Quote currency volume over 24h
    pub volume_quote: Option<Size>,
    /// Last update time (ISO 8601)
    pub timestamp: String,
}

/// A public trade print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicTrade {
    /// Trade ID
    pub id: u64,
    /// Execution price
    pub price: Price,
    /// Executed quantity
    pub quantity: Size,
    /// Taker side
    pub side: OrderSide,
    /// Execution time (ISO 8601)
    pub timestamp: String,
}

/// One OHLCV candle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Candle open time (ISO 8601)
    pub timestamp: String,
    /// Open price
    pub open: Price,
    /// Close price
    pub close: Price,
    /// Lowest price
    pub min: Price,
    /// Highest price
    pub max: Price,
    /// Base currency volume
    pub volume: Size,
    /// Quote currency volume
    pub volume_quote: Size,
}

/// Candle period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    /// 1 minute
    M1,
    /// 3 minutes
    M3,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    #[default]
    M30,
    /// 1 hour
    H1,
    /// 4 hours
    H4,
    /// 1 day
    D1,
    /// 7 days
    D7,
    /// 1 month
    #[serde(rename = "1M")]
    Month1,
}

impl Period {
    /// Wire representation of the period
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::M1 => "M1",
            Period::M3 => "M3",
            Period::M5 => "M5",
            Period::M15 => "M15",
            Period::M30 => "M30",
            Period::H1 => "H1",
            Period::H4 => "H4",
            Period::D1 => "D1",
            Period::D7 => "D7",
            Period::Month1 => "1M",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M1" => Ok(Period::M1),
            "M3" => Ok(Period::M3),
            "M5" => Ok(Period::M5),
            "M15" => Ok(Period::M15),
            "M30" => Ok(Period::M30),
            "H1" => Ok(Period::H1),
            "H4" => Ok(Period::H4),
            "D1" => Ok(Period::D1),
            "D7" => Ok(Period::D7),
            "1M" => Ok(Period::Month1),
            other => Err(format!("unknown candle period: {}", other)),
        }
    }
}
