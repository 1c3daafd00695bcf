// Market data acquisition modules
pub mod candle_source;
pub mod profile;
pub mod synthetic;

pub use candle_source::{CandleSource, PriceQuote, QuoteSource};
pub use profile::MarketProfile;
pub use synthetic::SyntheticCandleGenerator;
