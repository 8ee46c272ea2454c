use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::cli::display;
use crate::gateway::MarketGateway;

#[derive(Args, Clone)]
pub struct IndexArgs {
    /// Index name or FID, e.g. KOSPI, KOSDAQ or 0001
    #[arg(default_value = "KOSPI")]
    pub code: String,
}

pub struct IndexCommand {
    args: IndexArgs,
}

impl IndexCommand {
    pub fn new(args: IndexArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let index = gateway.market_index(&self.args.code).await?;
        display::print_index(&index);
        Ok(())
    }
}
