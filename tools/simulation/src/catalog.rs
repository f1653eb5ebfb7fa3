//! Symbol catalog
//!
//! The fixed set of tradable symbols and their base reference prices.
//! Built once per run and shared read-only by every session.

use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::numeric::Price;

/// One tradable symbol with its reference price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub symbol: Symbol,
    pub base_price: Price,
}

/// Immutable list of tradable symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCatalog {
    entries: Vec<CatalogEntry>,
}

impl SymbolCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Build from `(ticker, price)` pairs, skipping invalid tickers and
    /// non-positive prices.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Price)>) -> Self {
        let entries = pairs
            .into_iter()
            .filter(|(_, price)| price.is_positive())
            .filter_map(|(ticker, base_price)| {
                Symbol::try_new(ticker).map(|symbol| CatalogEntry { symbol, base_price })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn base_price(&self, symbol: &Symbol) -> Option<Price> {
        self.entries
            .iter()
            .find(|e| &e.symbol == symbol)
            .map(|e| e.base_price)
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::from_pairs([
            ("AAPL", Price::from_u64(150)),
            ("GOOGL", Price::from_u64(2800)),
            ("MSFT", Price::from_u64(400)),
            ("TSLA", Price::from_u64(250)),
            ("AMZN", Price::from_u64(150)),
            ("META", Price::from_u64(350)),
            ("NVDA", Price::from_u64(500)),
            ("NFLX", Price::from_u64(450)),
        ])
    }
}
