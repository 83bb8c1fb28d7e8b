//! Provider/model price tables

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token prices for one provider+model pair, in USD per million tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingEntry {
    pub input_price_per_million: Decimal,
    pub output_price_per_million: Decimal,
}

/// Price lookup table keyed by (provider, model)
///
/// Loaded once at startup; read-only thereafter.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: HashMap<(String, String), PricingEntry>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price entry for a provider+model pair.
    pub fn insert(
        &mut self,
        provider: impl Into<String>,
        model: impl Into<String>,
        entry: PricingEntry,
    ) {
        self.entries.insert((provider.into(), model.into()), entry);
    }

    pub fn get(&self, provider: &str, model: &str) -> Option<&PricingEntry> {
        self.entries
            .get(&(provider.to_string(), model.to_string()))
    }

    /// Cost of a request in USD.
    ///
    /// Returns `None` when no price entry exists for the pair, so callers can
    /// distinguish "untracked" from "zero-cost".
    pub fn estimate(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Option<Decimal> {
        let entry = self.get(provider, model)?;
        let input = Decimal::from(input_tokens) * entry.input_price_per_million;
        let output = Decimal::from(output_tokens) * entry.output_price_per_million;
        Some((input + output) / dec!(1_000_000))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
