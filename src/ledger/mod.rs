//! Team ledgers and order execution

pub mod engine;
pub mod store;
pub mod types;

pub use engine::{ExecutionEngine, TradeError};
pub use store::LedgerStore;
pub use types::{Holding, OrderRecord, OrderRequest, OrderStatus, Side, TeamLedger};
