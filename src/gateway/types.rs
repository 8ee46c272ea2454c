//! Data shapes returned by the market data gateway

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time quote for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub code: String,
    pub name: String,
    pub price: Decimal,
    /// Signed change against the previous close
    pub change: Decimal,
    /// Signed change in percent against the previous close
    pub change_rate: Decimal,
    pub volume: u64,
}

/// Level of a composite market index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIndex {
    pub code: String,
    pub name: String,
    pub value: Decimal,
    pub change: Decimal,
    pub change_rate: Decimal,
}

/// One bar of an index history chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCandle {
    /// Trading day, yyyyMMdd as the provider reports it
    pub date: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Aggregation period for index history requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ChartPeriod {
    /// Single-letter period code the provider expects
    pub fn code(&self) -> &'static str {
        match self {
            ChartPeriod::Daily => "D",
            ChartPeriod::Weekly => "W",
            ChartPeriod::Monthly => "M",
            ChartPeriod::Yearly => "Y",
        }
    }
}

/// Direction selector for the movers ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDirection {
    Rising,
    Falling,
}

/// Acknowledgement returned by the paper-trade order stubs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub external_ref: String,
    pub message: String,
    pub accepted_at: DateTime<Utc>,
}
