use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::cli::display;
use crate::gateway::MarketGateway;

#[derive(Args, Clone)]
pub struct VolumeArgs {
    /// Keep only the top N rows
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

pub struct VolumeCommand {
    args: VolumeArgs,
}

impl VolumeCommand {
    pub fn new(args: VolumeArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let mut quotes = gateway.volume_rank().await?;
        quotes.truncate(self.args.top);
        display::print_quote_table("VOLUME LEADERS", &quotes);
        Ok(())
    }
}
