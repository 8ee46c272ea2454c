use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::cli::display;
use crate::gateway::MarketGateway;

#[derive(Args, Clone)]
pub struct SearchArgs {
    /// Name fragment or code prefix
    pub keyword: String,
}

pub struct SearchCommand {
    args: SearchArgs,
}

impl SearchCommand {
    pub fn new(args: SearchArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let results = gateway.search(&self.args.keyword).await?;
        let title = format!("MATCHES FOR \"{}\"", self.args.keyword.trim());
        display::print_quote_table(&title, &results);
        Ok(())
    }
}
