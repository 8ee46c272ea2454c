//! Order execution against team ledgers

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::{info, warn};

use crate::gateway::MarketGateway;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{Holding, OrderRecord, OrderRequest, OrderStatus, Side};

/// Average acquisition prices are kept to four decimal places.
const AVG_PRICE_SCALE: u32 = 4;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid order: {0}")]
    InvalidOrder(&'static str),
    #[error("insufficient funds: need {needed} but only {available} available")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("insufficient holdings: tried to sell {requested} but only {held} held")]
    InsufficientHoldings { requested: u32, held: u32 },
}

/// Applies orders to team ledgers. Cash and holdings move atomically under
/// the team's ledger lock; forwarding to the provider order stub is
/// best-effort decoration and never rolls a settled ledger back.
pub struct ExecutionEngine {
    store: Arc<LedgerStore>,
    gateway: Arc<MarketGateway>,
}

impl ExecutionEngine {
    pub fn new(store: Arc<LedgerStore>, gateway: Arc<MarketGateway>) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// Execute one order for a team and append it to the shared history.
    pub async fn execute(
        &self,
        team_id: u64,
        actor_id: u64,
        request: OrderRequest,
    ) -> Result<OrderRecord, TradeError> {
        let code = request.code.trim().to_string();
        if code.is_empty() {
            return Err(TradeError::InvalidOrder("instrument code must not be blank"));
        }
        if request.quantity == 0 {
            return Err(TradeError::InvalidOrder("quantity must be positive"));
        }
        if request.price <= Decimal::ZERO {
            return Err(TradeError::InvalidOrder("price must be positive"));
        }

        let ledger = self.store.ledger(team_id);
        let mut ledger = ledger.lock().await;
        let quantity = Decimal::from(request.quantity);
        let gross = request.price * quantity;

        match request.side {
            Side::Buy => {
                if ledger.cash < gross {
                    return Err(TradeError::InsufficientFunds {
                        needed: gross,
                        available: ledger.cash,
                    });
                }
                ledger.cash -= gross;
                match ledger.holding_mut(&code) {
                    Some(holding) => {
                        holding.avg_price = weighted_average(
                            holding.avg_price,
                            holding.quantity,
                            request.price,
                            request.quantity,
                        );
                        holding.quantity += request.quantity;
                        if let Some(name) = non_blank(&request.name) {
                            holding.name = Some(name);
                        }
                    }
                    None => {
                        ledger.holdings.push(Holding {
                            code: code.clone(),
                            name: non_blank(&request.name),
                            quantity: request.quantity,
                            avg_price: request.price,
                        });
                    }
                }
            }
            Side::Sell => {
                let held = ledger.holding(&code).map(|h| h.quantity).unwrap_or(0);
                if held < request.quantity {
                    return Err(TradeError::InsufficientHoldings {
                        requested: request.quantity,
                        held,
                    });
                }
                ledger.cash += gross;
                if let Some(holding) = ledger.holding_mut(&code) {
                    holding.quantity -= request.quantity;
                }
                ledger.holdings.retain(|h| h.quantity > 0);
            }
        }

        // Ledger is settled; the provider stub only decorates the record
        // with an external reference when it happens to succeed.
        let external_ref = match self
            .gateway
            .place_order_stub(&code, request.quantity, request.price, request.side)
            .await
        {
            Ok(ack) => Some(ack.external_ref),
            Err(err) => {
                warn!(code = %code, error = %err, "order stub declined; keeping local fill");
                None
            }
        };

        let record = OrderRecord {
            id: self.store.next_order_id(),
            team_id,
            actor_id,
            code: code.clone(),
            name: non_blank(&request.name),
            quantity: request.quantity,
            price: request.price,
            side: request.side,
            status: OrderStatus::Completed,
            executed_at: Utc::now(),
            external_ref,
        };
        // Append to history before releasing the team lock so the log order
        // matches settlement order.
        self.store.record_order(record.clone()).await;
        drop(ledger);

        info!(
            team_id,
            code = %record.code,
            side = %record.side,
            quantity = record.quantity,
            price = %record.price,
            "order executed"
        );
        Ok(record)
    }
}

fn non_blank(name: &Option<String>) -> Option<String> {
    name.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Quantity-weighted average of the existing position and the new fill,
/// rounded half away from zero to the ledger scale.
fn weighted_average(
    held_price: Decimal,
    held_qty: u32,
    fill_price: Decimal,
    fill_qty: u32,
) -> Decimal {
    let held = Decimal::from(held_qty);
    let fill = Decimal::from(fill_qty);
    let total = held + fill;
    let blended = (held_price * held + fill_price * fill) / total;
    blended.round_dp_with_strategy(AVG_PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::config::ProviderConfig;

    fn unconfigured_engine() -> ExecutionEngine {
        let store = Arc::new(LedgerStore::new());
        let gateway = Arc::new(MarketGateway::new(ProviderConfig::default()).unwrap());
        ExecutionEngine::new(store, gateway)
    }

    fn configured_engine() -> ExecutionEngine {
        let store = Arc::new(LedgerStore::new());
        let config = ProviderConfig {
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            ..ProviderConfig::default()
        };
        let gateway = Arc::new(MarketGateway::new(config).unwrap());
        ExecutionEngine::new(store, gateway)
    }

    fn buy(code: &str, quantity: u32, price: Decimal) -> OrderRequest {
        OrderRequest {
            code: code.to_string(),
            name: Some("Samsung Electronics".to_string()),
            quantity,
            price,
            side: Side::Buy,
        }
    }

    fn sell(code: &str, quantity: u32, price: Decimal) -> OrderRequest {
        OrderRequest {
            code: code.to_string(),
            name: None,
            quantity,
            price,
            side: Side::Sell,
        }
    }

    #[tokio::test]
    async fn buys_blend_into_a_weighted_average() {
        let engine = unconfigured_engine();
        engine.execute(1, 10, buy("005930", 10, dec!(100))).await.unwrap();
        engine.execute(1, 10, buy("005930", 10, dec!(200))).await.unwrap();

        let ledger = engine.store().snapshot(1).await.unwrap();
        let holding = ledger.holding("005930").unwrap();
        assert_eq!(holding.quantity, 20);
        assert_eq!(holding.avg_price, dec!(150));
        assert_eq!(ledger.cash, dec!(10_000_000) - dec!(3000));
    }

    #[tokio::test]
    async fn average_rounds_half_away_from_zero() {
        let engine = unconfigured_engine();
        engine.execute(1, 10, buy("005930", 3, dec!(100))).await.unwrap();
        engine.execute(1, 10, buy("005930", 3, dec!(100.0001))).await.unwrap();

        let ledger = engine.store().snapshot(1).await.unwrap();
        let holding = ledger.holding("005930").unwrap();
        // (300 + 300.0003) / 6 = 100.00005 -> rounds up at scale 4
        assert_eq!(holding.avg_price, dec!(100.0001));
    }

    #[tokio::test]
    async fn rejected_buy_leaves_ledger_untouched() {
        let engine = unconfigured_engine();
        let result = engine.execute(1, 10, buy("005930", 1, dec!(20_000_000))).await;
        assert!(matches!(result, Err(TradeError::InsufficientFunds { .. })));

        let ledger = engine.store().snapshot(1).await.unwrap();
        assert_eq!(ledger.cash, dec!(10_000_000));
        assert!(ledger.holdings.is_empty());
        assert!(engine.store().orders_for_team(1).await.is_empty());
    }

    #[tokio::test]
    async fn selling_out_removes_the_holding() {
        let engine = unconfigured_engine();
        engine.execute(1, 10, buy("005930", 5, dec!(100))).await.unwrap();
        engine.execute(1, 10, sell("005930", 5, dec!(120))).await.unwrap();

        let ledger = engine.store().snapshot(1).await.unwrap();
        assert!(ledger.holding("005930").is_none());
        assert_eq!(ledger.cash, dec!(10_000_000) + dec!(100));
    }

    #[tokio::test]
    async fn overselling_is_rejected_without_mutation() {
        let engine = unconfigured_engine();
        engine.execute(1, 10, buy("005930", 2, dec!(100))).await.unwrap();
        let result = engine.execute(1, 10, sell("005930", 3, dec!(100))).await;
        assert!(matches!(
            result,
            Err(TradeError::InsufficientHoldings { requested: 3, held: 2 })
        ));

        let ledger = engine.store().snapshot(1).await.unwrap();
        assert_eq!(ledger.holding("005930").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn malformed_orders_are_rejected_up_front() {
        let engine = unconfigured_engine();
        assert!(matches!(
            engine.execute(1, 10, buy("  ", 1, dec!(100))).await,
            Err(TradeError::InvalidOrder(_))
        ));
        assert!(matches!(
            engine.execute(1, 10, buy("005930", 0, dec!(100))).await,
            Err(TradeError::InvalidOrder(_))
        ));
        assert!(matches!(
            engine.execute(1, 10, buy("005930", 1, dec!(0))).await,
            Err(TradeError::InvalidOrder(_))
        ));
    }

    #[tokio::test]
    async fn stub_failure_still_settles_the_order() {
        let engine = unconfigured_engine();
        let record = engine.execute(1, 10, buy("005930", 1, dec!(100))).await.unwrap();
        assert_eq!(record.status, OrderStatus::Completed);
        assert!(record.external_ref.is_none());
        assert_eq!(engine.store().orders_for_team(1).await.len(), 1);
    }

    #[tokio::test]
    async fn configured_stub_decorates_the_record() {
        let engine = configured_engine();
        let record = engine.execute(1, 10, buy("005930", 1, dec!(100))).await.unwrap();
        let external_ref = record.external_ref.unwrap();
        assert!(external_ref.starts_with("ORD-"));
    }
}
