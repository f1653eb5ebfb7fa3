//! Identity types that travel on the wire
//!
//! Both identities are embedded verbatim in `:`-delimited, newline-terminated
//! commands, so the delimiter and line terminators are never allowed inside them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that would corrupt a command line.
const FORBIDDEN: [char; 3] = [':', '\r', '\n'];

fn is_wire_safe(s: &str) -> bool {
    !s.is_empty() && !s.contains(FORBIDDEN)
}

/// Identity of a simulated trader
///
/// Unique within a run. Sent as-is in `REGISTER` and `ORDER` commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraderId(String);

impl TraderId {
    /// Create a new TraderId
    ///
    /// # Panics
    /// Panics if the identity is empty or contains `:` or a line terminator
    pub fn new(id: impl Into<String>) -> Self {
        let s = id.into();
        assert!(is_wire_safe(&s), "TraderId must be non-empty and free of ':' and newlines");
        Self(s)
    }

    /// Try to create a TraderId, returning None if invalid
    pub fn try_new(id: impl Into<String>) -> Option<Self> {
        let s = id.into();
        if is_wire_safe(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tradable instrument ticker (e.g. "AAPL")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol
    ///
    /// # Panics
    /// Panics if the ticker is empty or contains `:` or a line terminator
    pub fn new(ticker: impl Into<String>) -> Self {
        let s = ticker.into();
        assert!(is_wire_safe(&s), "Symbol must be non-empty and free of ':' and newlines");
        Self(s)
    }

    /// Try to create a Symbol, returning None if invalid
    pub fn try_new(ticker: impl Into<String>) -> Option<Self> {
        let s = ticker.into();
        if is_wire_safe(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
