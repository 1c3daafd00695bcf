use crate::domain::errors::MarketDataError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use async_trait::async_trait;

/// Raw access to an exchange's candle and ticker endpoints.
///
/// Implementations perform exactly one upstream call per method invocation;
/// retry and fallback policy belongs to the caller.
#[async_trait]
pub trait KlineFeed: Send + Sync {
    /// Most recent `limit` candles, oldest first
    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError>;
}
