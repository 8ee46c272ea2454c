use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::display;
use crate::feed::cache::PriceCache;
use crate::feed::connection::{FeedConfig, FeedConnection};
use crate::feed::subscriptions::{normalize_code, SubscriptionManager};
use crate::gateway::MarketGateway;

#[derive(Args, Clone)]
pub struct WatchArgs {
    /// Instrument codes to stream
    #[arg(required = true)]
    pub codes: Vec<String>,

    /// Seconds between table refreshes
    #[arg(long, default_value_t = 1)]
    pub interval: u64,
}

pub struct WatchCommand {
    args: WatchArgs,
}

impl WatchCommand {
    pub fn new(args: WatchArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        if !gateway.is_configured() {
            bail!("realtime watch needs KIS_APP_KEY and KIS_APP_SECRET set");
        }

        let cache = Arc::new(PriceCache::new());
        let subs = Arc::new(SubscriptionManager::new());
        for code in &self.args.codes {
            subs.ensure_subscribed(code).await;
        }

        let feed = Arc::new(FeedConnection::new(
            gateway,
            cache.clone(),
            subs,
            FeedConfig::default(),
        ));
        let runner = feed.clone();
        let task = tokio::spawn(async move { runner.run().await });

        let codes: Vec<String> = self.args.codes.iter().map(|c| normalize_code(c)).collect();
        let mut refresh = tokio::time::interval(Duration::from_secs(self.args.interval.max(1)));
        println!(
            "{}",
            "Streaming realtime prices, press Ctrl+C to stop".bright_black().italic()
        );

        loop {
            tokio::select! {
                _ = refresh.tick() => {
                    display::print_watch_frame(&cache, &codes);
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\n{}", "Stopping feed".bright_black());
                    break;
                }
            }
        }

        feed.shutdown();
        let _ = task.await;
        Ok(())
    }
}
