use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::cli::display;
use crate::feed::cache::{PriceCache, PriceTick};
use crate::gateway::MarketGateway;
use crate::ledger::engine::ExecutionEngine;
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{OrderRequest, Side};
use crate::rooms::{InMemoryRoomDirectory, RoomDirectory};
use crate::valuation::Valuator;
use crate::voting::{Choice, ProposalDraft, VotingEngine};

#[derive(Args, Clone)]
pub struct DemoArgs {
    /// Tick price injected for Samsung Electronics before the standings
    #[arg(long, default_value = "75000")]
    pub tick_price: Decimal,
}

/// Runs two rooms through a full local session: a vote that passes and
/// trades, a vote that gets rejected, direct orders, then the leaderboard.
/// Works without credentials; the order stub just declines decoration.
pub struct DemoCommand {
    args: DemoArgs,
}

impl DemoCommand {
    pub fn new(args: DemoArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        directory.add_room(1, "Alpha");
        for member in [10, 11, 12] {
            directory.add_member(1, member);
        }
        directory.add_room(2, "Beta");
        for member in [20, 21] {
            directory.add_member(2, member);
        }

        let store = Arc::new(LedgerStore::new());
        let cache = Arc::new(PriceCache::new());
        let execution = Arc::new(ExecutionEngine::new(store.clone(), gateway.clone()));
        let voting = VotingEngine::new(directory.clone(), execution.clone(), store.clone());
        let valuator = Valuator::new(store.clone(), cache.clone(), gateway, directory.clone());

        println!(
            "{}",
            "Scripted session: two rooms, two votes, one direct trade"
                .bright_black()
                .italic()
        );

        // Alpha votes a Samsung buy through.
        let passed = voting
            .create_proposal(
                1,
                10,
                "mina",
                ProposalDraft {
                    side: Side::Buy,
                    name: "Samsung Electronics".to_string(),
                    code: Some("005930".to_string()),
                    quantity: 10,
                    price: Some(Decimal::from(70_000u32)),
                    reason: "Earnings beat and a cheap multiple".to_string(),
                },
            )
            .await?;
        voting.submit_choice(1, passed.id, 11, "juno", Choice::Agree).await?;

        // A second idea dies on the floor.
        let rejected = voting
            .create_proposal(
                1,
                11,
                "juno",
                ProposalDraft {
                    side: Side::Buy,
                    name: "SK hynix".to_string(),
                    code: Some("000660".to_string()),
                    quantity: 5,
                    price: Some(Decimal::from(120_000u32)),
                    reason: "Momentum chase".to_string(),
                },
            )
            .await?;
        voting.submit_choice(1, rejected.id, 10, "mina", Choice::Disagree).await?;
        voting.submit_choice(1, rejected.id, 12, "hana", Choice::Disagree).await?;

        // Beta trades directly: buy five Kakao, then trim two.
        execution
            .execute(
                2,
                20,
                OrderRequest {
                    code: "035720".to_string(),
                    name: Some("Kakao".to_string()),
                    quantity: 5,
                    price: Decimal::from(40_000u32),
                    side: Side::Buy,
                },
            )
            .await?;
        execution
            .execute(
                2,
                20,
                OrderRequest {
                    code: "035720".to_string(),
                    name: None,
                    quantity: 2,
                    price: Decimal::from(42_000u32),
                    side: Side::Sell,
                },
            )
            .await?;

        // Pretend the feed saw Samsung move so the standings have a spread.
        cache.insert(
            "005930",
            PriceTick {
                price: self.args.tick_price,
                change: self.args.tick_price - Decimal::from(70_000u32),
                change_rate: Decimal::ZERO,
                volume: 1_200_000,
                updated_at: Utc::now(),
            },
        );

        for room in directory.active_rooms().await {
            if let Some(ledger) = store.snapshot(room.id).await {
                display::print_ledger(&room.name, &ledger);
                display::print_orders(&store.orders_for_team(room.id).await);
            }
        }
        display::print_proposals(&voting.list_proposals(1).await);
        display::print_standings(&valuator.rank_teams().await);
        Ok(())
    }
}
