use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::cli::display;
use crate::gateway::types::RankDirection;
use crate::gateway::MarketGateway;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Direction {
    Rising,
    Falling,
}

impl From<Direction> for RankDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Rising => RankDirection::Rising,
            Direction::Falling => RankDirection::Falling,
        }
    }
}

#[derive(Args, Clone)]
pub struct MoversArgs {
    /// Which way the movers moved
    #[arg(long, value_enum, default_value = "rising")]
    pub direction: Direction,

    /// Keep only the top N rows
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

pub struct MoversCommand {
    args: MoversArgs,
}

impl MoversCommand {
    pub fn new(args: MoversArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let mut quotes = gateway.fluctuation_rank(self.args.direction.into()).await?;
        quotes.truncate(self.args.top);
        let title = match self.args.direction {
            Direction::Rising => "TOP RISERS",
            Direction::Falling => "TOP FALLERS",
        };
        display::print_quote_table(title, &quotes);
        Ok(())
    }
}
