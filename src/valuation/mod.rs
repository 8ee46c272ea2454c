//! Cache-first valuation and room standings

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use crate::feed::cache::PriceCache;
use crate::feed::subscriptions::normalize_code;
use crate::gateway::MarketGateway;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{initial_balance, TeamLedger};
use crate::rooms::RoomDirectory;

/// Profit rates are reported to four decimal places.
const PROFIT_RATE_SCALE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamValuation {
    pub team_id: u64,
    pub cash: Decimal,
    pub holdings_value: Decimal,
    pub total: Decimal,
}

/// One row of the cross-room leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStanding {
    pub rank: u32,
    pub room_id: u64,
    pub room_name: String,
    pub total_value: Decimal,
    pub profit_rate: Decimal,
}

/// Marks ledgers to market. Live ticks beat REST quotes beat the position's
/// own average cost, in that order.
pub struct Valuator {
    store: Arc<LedgerStore>,
    cache: Arc<PriceCache>,
    gateway: Arc<MarketGateway>,
    directory: Arc<dyn RoomDirectory>,
}

impl Valuator {
    pub fn new(
        store: Arc<LedgerStore>,
        cache: Arc<PriceCache>,
        gateway: Arc<MarketGateway>,
        directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        Self {
            store,
            cache,
            gateway,
            directory,
        }
    }

    /// Current price for an instrument, None when no source can answer.
    pub async fn spot_price(&self, code: &str) -> Option<Decimal> {
        if let Some(tick) = self.cache.get(code) {
            return Some(tick.price);
        }
        let padded = normalize_code(code);
        if padded != code {
            if let Some(tick) = self.cache.get(&padded) {
                return Some(tick.price);
            }
        }
        match self.gateway.quote(code).await {
            Ok(quote) => Some(quote.price),
            Err(err) => {
                debug!(code = %code, error = %err, "no live price available");
                None
            }
        }
    }

    /// Mark one team to market. A team that never traded values at seed
    /// cash.
    pub async fn team_valuation(&self, team_id: u64) -> TeamValuation {
        let ledger = match self.store.snapshot(team_id).await {
            Some(ledger) => ledger,
            None => TeamLedger::new(team_id),
        };

        let mut holdings_value = Decimal::ZERO;
        for holding in &ledger.holdings {
            let price = self
                .spot_price(&holding.code)
                .await
                .unwrap_or(holding.avg_price);
            holdings_value += price * Decimal::from(holding.quantity);
        }

        TeamValuation {
            team_id,
            cash: ledger.cash,
            holdings_value,
            total: ledger.cash + holdings_value,
        }
    }

    /// Leaderboard over the directory's active rooms, best total first.
    /// Ties keep the lower room id ahead.
    pub async fn rank_teams(&self) -> Vec<TeamStanding> {
        let rooms = self.directory.active_rooms().await;
        let mut rows = Vec::with_capacity(rooms.len());
        for room in rooms {
            let valuation = self.team_valuation(room.id).await;
            rows.push((room, valuation));
        }
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.id.cmp(&b.0.id)));

        let initial = initial_balance();
        rows.into_iter()
            .enumerate()
            .map(|(idx, (room, valuation))| TeamStanding {
                rank: idx as u32 + 1,
                room_id: room.id,
                room_name: room.name,
                total_value: valuation.total,
                profit_rate: ((valuation.total - initial) / initial).round_dp_with_strategy(
                    PROFIT_RATE_SCALE,
                    RoundingStrategy::MidpointAwayFromZero,
                ),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::config::ProviderConfig;
    use crate::feed::cache::PriceTick;
    use crate::ledger::types::Holding;
    use crate::rooms::InMemoryRoomDirectory;

    fn tick(price: Decimal) -> PriceTick {
        PriceTick {
            price,
            change: Decimal::ZERO,
            change_rate: Decimal::ZERO,
            volume: 0,
            updated_at: Utc::now(),
        }
    }

    fn harness() -> (Arc<LedgerStore>, Arc<PriceCache>, Arc<InMemoryRoomDirectory>, Valuator) {
        let store = Arc::new(LedgerStore::new());
        let cache = Arc::new(PriceCache::new());
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let gateway = Arc::new(MarketGateway::new(ProviderConfig::default()).unwrap());
        let valuator = Valuator::new(store.clone(), cache.clone(), gateway, directory.clone());
        (store, cache, directory, valuator)
    }

    async fn seed_holding(store: &LedgerStore, team_id: u64, code: &str, quantity: u32, avg: Decimal) {
        let ledger = store.ledger(team_id);
        let mut ledger = ledger.lock().await;
        let cost = avg * Decimal::from(quantity);
        ledger.cash -= cost;
        ledger.holdings.push(Holding {
            code: code.to_string(),
            name: None,
            quantity,
            avg_price: avg,
        });
    }

    #[tokio::test]
    async fn cached_tick_wins_even_for_short_codes() {
        let (_, cache, _, valuator) = harness();
        cache.insert("000660", tick(dec!(120000)));

        assert_eq!(valuator.spot_price("000660").await, Some(dec!(120000)));
        assert_eq!(valuator.spot_price("660").await, Some(dec!(120000)));
        assert_eq!(valuator.spot_price("005930").await, None);
    }

    #[tokio::test]
    async fn untraded_team_values_at_seed_cash() {
        let (_, _, _, valuator) = harness();
        let valuation = valuator.team_valuation(42).await;
        assert_eq!(valuation.cash, dec!(10_000_000));
        assert_eq!(valuation.holdings_value, dec!(0));
        assert_eq!(valuation.total, dec!(10_000_000));
    }

    #[tokio::test]
    async fn offline_valuation_falls_back_to_average_cost() {
        let (store, _, _, valuator) = harness();
        seed_holding(&store, 1, "005930", 10, dec!(100)).await;

        let valuation = valuator.team_valuation(1).await;
        assert_eq!(valuation.holdings_value, dec!(1000));
        assert_eq!(valuation.total, dec!(10_000_000));
    }

    #[tokio::test]
    async fn live_ticks_move_the_valuation() {
        let (store, cache, _, valuator) = harness();
        seed_holding(&store, 1, "005930", 10, dec!(100)).await;
        cache.insert("005930", tick(dec!(150)));

        let valuation = valuator.team_valuation(1).await;
        assert_eq!(valuation.holdings_value, dec!(1500));
        assert_eq!(valuation.total, dec!(10_000_000) + dec!(500));
    }

    #[tokio::test]
    async fn standings_rank_by_total_with_rounded_profit_rate() {
        let (store, cache, directory, valuator) = harness();
        directory.add_room(1, "Alpha");
        directory.add_room(2, "Beta");

        seed_holding(&store, 1, "005930", 10, dec!(100_000)).await;
        cache.insert("005930", tick(dec!(120_000)));

        let standings = valuator.rank_teams().await;
        assert_eq!(standings.len(), 2);

        assert_eq!(standings[0].rank, 1);
        assert_eq!(standings[0].room_name, "Alpha");
        assert_eq!(standings[0].total_value, dec!(10_200_000));
        assert_eq!(standings[0].profit_rate, dec!(0.0200));

        assert_eq!(standings[1].rank, 2);
        assert_eq!(standings[1].room_id, 2);
        assert_eq!(standings[1].profit_rate, dec!(0.0000));
    }

    #[tokio::test]
    async fn equal_totals_keep_the_lower_room_first() {
        let (_, _, directory, valuator) = harness();
        directory.add_room(2, "Beta");
        directory.add_room(1, "Alpha");

        let standings = valuator.rank_teams().await;
        assert_eq!(standings[0].room_id, 1);
        assert_eq!(standings[1].room_id, 2);
    }
}
