use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::cli::display;
use crate::gateway::MarketGateway;

#[derive(Args, Clone)]
pub struct QuoteArgs {
    /// Instrument code, e.g. 005930
    pub code: String,
}

pub struct QuoteCommand {
    args: QuoteArgs,
}

impl QuoteCommand {
    pub fn new(args: QuoteArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        info!(code = %self.args.code, "fetching quote");
        let quote = gateway.quote(&self.args.code).await?;
        display::print_quote(&quote);
        Ok(())
    }
}
