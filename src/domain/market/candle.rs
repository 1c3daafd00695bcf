use crate::domain::market::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

/// One OHLCV observation. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    /// high >= max(open, close) and low <= min(open, close), all prices finite
    pub fn is_consistent(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.close_time >= self.open_time
    }
}

/// Where a candle series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Synthetic,
}

/// Time-ordered window of candles for one (symbol, timeframe) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub provenance: Provenance,
}

impl CandleSeries {
    pub fn live(symbol: impl Into<String>, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
            provenance: Provenance::Live,
        }
    }

    pub fn synthetic(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
            provenance: Provenance::Synthetic,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Strictly increasing open times
    pub fn is_time_ordered(&self) -> bool {
        self.candles
            .windows(2)
            .all(|pair| pair[1].open_time > pair[0].open_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_time: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time,
            open,
            high,
            low,
            close,
            volume: 10.0,
            close_time: open_time + 59_999,
        }
    }

    #[test]
    fn test_consistency_checks_wicks() {
        assert!(candle(0, 10.0, 11.0, 9.0, 10.5).is_consistent());
        assert!(!candle(0, 10.0, 10.2, 9.0, 10.5).is_consistent());
        assert!(!candle(0, 10.0, 11.0, 10.1, 10.5).is_consistent());
        assert!(!candle(0, f64::NAN, 11.0, 9.0, 10.5).is_consistent());
    }

    #[test]
    fn test_series_ordering() {
        let ordered = CandleSeries::live(
            "BTCUSDT",
            Timeframe::OneHour,
            vec![candle(0, 1.0, 1.0, 1.0, 1.0), candle(1, 1.0, 1.0, 1.0, 2.0)],
        );
        assert!(ordered.is_time_ordered());
        assert_eq!(ordered.last_close(), Some(2.0));
        assert!(!ordered.is_synthetic());

        let duplicated = CandleSeries::synthetic(
            "BTCUSDT",
            Timeframe::OneHour,
            vec![candle(5, 1.0, 1.0, 1.0, 1.0), candle(5, 1.0, 1.0, 1.0, 1.0)],
        );
        assert!(!duplicated.is_time_ordered());
        assert!(duplicated.is_synthetic());
    }
}
