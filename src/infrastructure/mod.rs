pub mod binance;
pub mod core;
pub mod mock;
pub mod observability;

pub use binance::BinanceKlineFeed;
pub use mock::{ScriptedKlineFeed, UnreachableFeed};
