//! Random order generator
//!
//! Produces limit orders around the catalog's reference prices with a
//! seeded RNG, one generator per session so nothing random is shared.

use crate::catalog::SymbolCatalog;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use types::numeric::Quantity;
use types::order::{OrderIntent, Side};

/// Shape of the generated order flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Maximum price offset from the reference price, in bps either way
    pub max_jitter_bps: i64,
    /// Smallest quantity drawn
    pub min_quantity: u32,
    /// Largest quantity drawn (inclusive)
    pub max_quantity: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_jitter_bps: 500,
            min_quantity: 1,
            max_quantity: 20,
        }
    }
}

/// Per-session order generator with deterministic seeded RNG.
pub struct OrderGenerator {
    catalog: Arc<SymbolCatalog>,
    config: GeneratorConfig,
    rng: ChaCha8Rng,
}

impl OrderGenerator {
    pub fn new(catalog: Arc<SymbolCatalog>, config: GeneratorConfig, seed: u64) -> Self {
        Self {
            catalog,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the thread RNG when no reproducible seed was requested.
    pub fn from_entropy(catalog: Arc<SymbolCatalog>, config: GeneratorConfig) -> Self {
        Self::new(catalog, config, rand::random())
    }

    /// Draw the next order. Returns None only for an empty catalog.
    pub fn next_intent(&mut self) -> Option<OrderIntent> {
        let entries = self.catalog.entries();
        if entries.is_empty() {
            return None;
        }
        let entry = &entries[self.rng.gen_range(0..entries.len())];

        let side = if self.rng.gen_bool(0.5) { Side::BUY } else { Side::SELL };

        let spread = self.config.max_jitter_bps.abs();
        let bps = self.rng.gen_range(-spread..=spread);
        let price = entry.base_price.jittered(bps);

        let min_q = self.config.min_quantity.max(1);
        let max_q = self.config.max_quantity.max(min_q);
        let quantity = Quantity::try_new(self.rng.gen_range(min_q..=max_q))?;

        Some(OrderIntent::limit(entry.symbol.clone(), side, price, quantity))
    }
}
