//! Fixed-point decimal prices and integer quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Prices are held at 2 decimal places with HALF_UP rounding.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits carried by a price on the wire.
pub const PRICE_DP: u32 = 2;

/// Basis points in one whole (100%).
const BPS_PER_UNIT: i64 = 10_000;

/// Limit price, always rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rounding HALF_UP to 2 decimal places
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn from_u64(value: u64) -> Self {
        Self::new(Decimal::from(value))
    }

    /// Parse a decimal string such as "150.5"
    pub fn from_str(s: &str) -> Option<Self> {
        Decimal::from_str_exact(s).ok().map(Self::new)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Scale by `(10_000 + bps) / 10_000` and re-round.
    ///
    /// `jittered(-500)` is 5% below, `jittered(500)` 5% above.
    pub fn jittered(&self, bps: i64) -> Self {
        let factor = Decimal::from(BPS_PER_UNIT + bps) / Decimal::from(BPS_PER_UNIT);
        Self::new(self.0 * factor)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Order quantity in whole units. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Returns None for zero
    pub fn try_new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
