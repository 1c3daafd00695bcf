// Market data primitives
pub mod candle;
pub mod timeframe;
