//! Last-tick price cache shared between the feed task and readers

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Most recent realtime observation for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTick {
    pub price: Decimal,
    pub change: Decimal,
    pub change_rate: Decimal,
    pub volume: u64,
    pub updated_at: DateTime<Utc>,
}

/// Concurrent map of instrument code to its latest tick.
///
/// Writes win in arrival order and no history is kept; readers that need a
/// price when no tick has arrived fall back to the gateway.
#[derive(Default)]
pub struct PriceCache {
    ticks: DashMap<String, PriceTick>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: &str, tick: PriceTick) {
        self.ticks.insert(code.to_string(), tick);
    }

    pub fn get(&self, code: &str) -> Option<PriceTick> {
        self.ticks.get(code).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.ticks.iter().map(|entry| entry.key().clone()).collect()
    }
}
