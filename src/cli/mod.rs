//! Command-line interface
//!
//! clap subcommands over the market gateway, the realtime feed and the
//! team trading engines. Each command lives in its own file under
//! `commands/` as an Args struct plus a Command that executes it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub mod commands;
pub mod display;

use crate::config::ProviderConfig;
use crate::gateway::MarketGateway;
use crate::logging;

use commands::chart::{ChartArgs, ChartCommand};
use commands::demo::{DemoArgs, DemoCommand};
use commands::index::{IndexArgs, IndexCommand};
use commands::movers::{MoversArgs, MoversCommand};
use commands::quote::{QuoteArgs, QuoteCommand};
use commands::search::{SearchArgs, SearchCommand};
use commands::volume::{VolumeArgs, VolumeCommand};
use commands::watch::{WatchArgs, WatchCommand};

#[derive(Parser)]
#[command(name = "teamtrade")]
#[command(version)]
#[command(about = "Group trading simulator over the KIS market data API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Also write logs to this file (a directory gets a session file name)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a live quote for one instrument
    Quote(QuoteArgs),

    /// List today's volume leaders
    Volume(VolumeArgs),

    /// List today's biggest movers
    Movers(MoversArgs),

    /// Show a market index level
    Index(IndexArgs),

    /// Show index candles for a date range
    Chart(ChartArgs),

    /// Search instruments by name or code
    Search(SearchArgs),

    /// Stream realtime prices for a set of instruments
    Watch(WatchArgs),

    /// Run a scripted two-room trading session locally
    Demo(DemoArgs),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let verbose = self.verbose > 0;
        match &self.log_file {
            Some(path) => {
                let path = logging::resolve_log_path(path);
                logging::init_with_file(&path, verbose)?;
            }
            None => logging::init_console(verbose),
        }

        let config = ProviderConfig::from_env();
        let gateway =
            Arc::new(MarketGateway::new(config).context("failed to build market gateway")?);

        match self.command {
            Commands::Quote(args) => QuoteCommand::new(args).execute(gateway).await,
            Commands::Volume(args) => VolumeCommand::new(args).execute(gateway).await,
            Commands::Movers(args) => MoversCommand::new(args).execute(gateway).await,
            Commands::Index(args) => IndexCommand::new(args).execute(gateway).await,
            Commands::Chart(args) => ChartCommand::new(args).execute(gateway).await,
            Commands::Search(args) => SearchCommand::new(args).execute(gateway).await,
            Commands::Watch(args) => WatchCommand::new(args).execute(gateway).await,
            Commands::Demo(args) => DemoCommand::new(args).execute(gateway).await,
        }
    }
}
