//! Order vocabulary
//!
//! Side and kind carry their exact wire spelling; `OrderIntent` is one
//! synthetic order, built right before it is sent and never stored.

use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Side::BUY => "BUY",
            Side::SELL => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Order type accepted by the matching server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    /// Rests on the book at its limit price
    LIMIT,
    /// Executes against the best available price
    MARKET,
}

impl OrderKind {
    pub fn as_wire(&self) -> &'static str {
        match self {
            OrderKind::LIMIT => "LIMIT",
            OrderKind::MARKET => "MARKET",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One randomly generated order ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderIntent {
    /// Create a limit order intent
    pub fn limit(symbol: Symbol, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            symbol,
            side,
            kind: OrderKind::LIMIT,
            price,
            quantity,
        }
    }
}
