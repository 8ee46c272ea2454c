//! Shared in-memory store for ledgers and order history

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use crate::ledger::types::{OrderRecord, OrderStatus, Side, TeamLedger};

/// Process-wide ledger state. Each team ledger sits behind its own mutex so
/// one team's execution never blocks another's; the order history is a
/// single append-mostly list shared by all teams.
pub struct LedgerStore {
    ledgers: DashMap<u64, Arc<Mutex<TeamLedger>>>,
    orders: RwLock<Vec<OrderRecord>>,
    next_order_id: AtomicU64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
            orders: RwLock::new(Vec::new()),
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Fetch a team's ledger, creating it with seed cash on first touch.
    pub fn ledger(&self, team_id: u64) -> Arc<Mutex<TeamLedger>> {
        self.ledgers
            .entry(team_id)
            .or_insert_with(|| Arc::new(Mutex::new(TeamLedger::new(team_id))))
            .clone()
    }

    /// Point-in-time copy of a team's ledger, None if the team has never
    /// traded.
    pub async fn snapshot(&self, team_id: u64) -> Option<TeamLedger> {
        let ledger = self.ledgers.get(&team_id)?.clone();
        let guard = ledger.lock().await;
        Some(guard.clone())
    }

    pub fn team_ids(&self) -> Vec<u64> {
        self.ledgers.iter().map(|entry| *entry.key()).collect()
    }

    pub fn next_order_id(&self) -> u64 {
        self.next_order_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn record_order(&self, record: OrderRecord) {
        self.orders.write().await.push(record);
    }

    /// A team's order history, newest first.
    pub async fn orders_for_team(&self, team_id: u64) -> Vec<OrderRecord> {
        let orders = self.orders.read().await;
        let mut out: Vec<OrderRecord> = orders
            .iter()
            .filter(|order| order.team_id == team_id)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    /// Most recent completed execution price for a team and instrument on
    /// the given side, at or after `since`.
    pub async fn latest_execution_price(
        &self,
        team_id: u64,
        code: &str,
        side: Side,
        since: DateTime<Utc>,
    ) -> Option<Decimal> {
        let orders = self.orders.read().await;
        orders
            .iter()
            .rev()
            .find(|order| {
                order.team_id == team_id
                    && order.code == code
                    && order.side == side
                    && order.status == OrderStatus::Completed
                    && order.executed_at >= since
            })
            .map(|order| order.price)
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
