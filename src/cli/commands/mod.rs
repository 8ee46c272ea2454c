pub mod chart;
pub mod demo;
pub mod index;
pub mod movers;
pub mod quote;
pub mod search;
pub mod volume;
pub mod watch;
