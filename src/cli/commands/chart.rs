use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::cli::display;
use crate::gateway::types::ChartPeriod;
use crate::gateway::MarketGateway;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<Period> for ChartPeriod {
    fn from(period: Period) -> Self {
        match period {
            Period::Daily => ChartPeriod::Daily,
            Period::Weekly => ChartPeriod::Weekly,
            Period::Monthly => ChartPeriod::Monthly,
            Period::Yearly => ChartPeriod::Yearly,
        }
    }
}

#[derive(Args, Clone)]
pub struct ChartArgs {
    /// Index name or FID, e.g. KOSPI
    pub code: String,

    /// Range start, yyyyMMdd
    #[arg(long)]
    pub start: String,

    /// Range end, yyyyMMdd
    #[arg(long)]
    pub end: String,

    /// Candle width
    #[arg(long, value_enum, default_value = "daily")]
    pub period: Period,
}

pub struct ChartCommand {
    args: ChartArgs,
}

impl ChartCommand {
    pub fn new(args: ChartArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, gateway: Arc<MarketGateway>) -> Result<()> {
        let candles = gateway
            .index_chart(
                &self.args.code,
                &self.args.start,
                &self.args.end,
                self.args.period.into(),
            )
            .await?;
        let title = format!(
            "{} {} to {}",
            self.args.code.to_uppercase(),
            self.args.start,
            self.args.end
        );
        display::print_candles(&title, &candles);
        Ok(())
    }
}
