//! Ledger data model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seed cash for every team ledger, in KRW.
pub const INITIAL_TEAM_BALANCE: u64 = 10_000_000;

/// Seed cash as the exact decimal every balance computation starts from.
pub fn initial_balance() -> Decimal {
    Decimal::from(INITIAL_TEAM_BALANCE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

/// One instrument position inside a team ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    pub name: Option<String>,
    pub quantity: u32,
    /// Weighted average acquisition price across all buys still held.
    pub avg_price: Decimal,
}

/// Cash plus positions for one team. Holdings are keyed by instrument code
/// and disappear entirely when their quantity reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamLedger {
    pub team_id: u64,
    pub cash: Decimal,
    pub holdings: Vec<Holding>,
}

impl TeamLedger {
    pub fn new(team_id: u64) -> Self {
        Self {
            team_id,
            cash: initial_balance(),
            holdings: Vec::new(),
        }
    }

    pub fn holding(&self, code: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.code == code)
    }

    pub fn holding_mut(&mut self, code: &str) -> Option<&mut Holding> {
        self.holdings.iter_mut().find(|h| h.code == code)
    }
}

/// An execution request as it arrives from voting or the demo driver.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub code: String,
    pub name: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
    pub side: Side,
}

/// A settled order as recorded in the shared history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: u64,
    pub team_id: u64,
    pub actor_id: u64,
    pub code: String,
    pub name: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
    pub side: Side,
    pub status: OrderStatus,
    pub executed_at: DateTime<Utc>,
    /// Provider order reference when the decoration step succeeded.
    pub external_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_ledger_holds_seed_cash_and_no_positions() {
        let ledger = TeamLedger::new(7);
        assert_eq!(ledger.team_id, 7);
        assert_eq!(ledger.cash, dec!(10_000_000));
        assert!(ledger.holdings.is_empty());
    }

    #[test]
    fn side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }
}
