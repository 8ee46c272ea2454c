//! Realtime price feed: connection, subscription bookkeeping and tick cache

pub mod cache;
pub mod connection;
pub mod subscriptions;

pub use cache::{PriceCache, PriceTick};
pub use connection::{FeedConfig, FeedConnection, FeedState};
pub use subscriptions::SubscriptionManager;
