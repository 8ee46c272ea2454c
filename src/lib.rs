pub mod cli;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod rooms;
pub mod valuation;
pub mod voting;

// Re-export the types most callers reach for
pub use gateway::MarketGateway;
pub use ledger::{ExecutionEngine, LedgerStore};
pub use voting::VotingEngine;
