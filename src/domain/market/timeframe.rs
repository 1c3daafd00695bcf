use crate::domain::errors::ScanRequestError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MINUTE_MS: i64 = 60_000;

/// Candle resolutions accepted by a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    FourHour,
    OneDay,
    OneWeek,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::FiveMin => 5,
            Timeframe::FifteenMin => 15,
            Timeframe::ThirtyMin => 30,
            Timeframe::OneHour => 60,
            Timeframe::FourHour => 240,
            Timeframe::OneDay => 1_440,
            Timeframe::OneWeek => 10_080,
        }
    }

    /// Fixed spacing between consecutive candle open times
    pub fn interval_ms(&self) -> i64 {
        self.to_minutes() * MINUTE_MS
    }

    /// Binance `interval` query value
    pub fn binance_interval(&self) -> &'static str {
        match self {
            Timeframe::FiveMin => "5m",
            Timeframe::FifteenMin => "15m",
            Timeframe::ThirtyMin => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHour => "4h",
            Timeframe::OneDay => "1d",
            Timeframe::OneWeek => "1w",
        }
    }

    /// Consolidation rank: higher wins when a symbol has results on several timeframes.
    ///
    /// 1w > 1d > 4h > 1h > 30m > 15m > 5m
    pub fn priority(&self) -> u8 {
        match self {
            Timeframe::OneWeek => 7,
            Timeframe::OneDay => 6,
            Timeframe::FourHour => 5,
            Timeframe::OneHour => 4,
            Timeframe::ThirtyMin => 3,
            Timeframe::FifteenMin => 2,
            Timeframe::FiveMin => 1,
        }
    }

    /// Returns all timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::ThirtyMin,
            Timeframe::OneHour,
            Timeframe::FourHour,
            Timeframe::OneDay,
            Timeframe::OneWeek,
        ]
    }

    /// Returns the start timestamp (ms) of the period containing `timestamp_ms`.
    ///
    /// Weekly periods are aligned on Monday 00:00 UTC like Binance `1w` klines
    /// (the Unix epoch fell on a Thursday, hence the 3-day shift).
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        let period = self.interval_ms();
        match self {
            Timeframe::OneWeek => {
                let shift = 3 * Timeframe::OneDay.interval_ms();
                let shifted = timestamp_ms + shift;
                shifted - shifted.rem_euclid(period) - shift
            }
            _ => timestamp_ms - timestamp_ms.rem_euclid(period),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ScanRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" would be a month on Binance; only lowercase minute labels are accepted
        match s.trim() {
            "5m" | "5min" => Ok(Timeframe::FiveMin),
            "15m" | "15min" => Ok(Timeframe::FifteenMin),
            "30m" | "30min" => Ok(Timeframe::ThirtyMin),
            "1h" | "1H" | "60m" => Ok(Timeframe::OneHour),
            "4h" | "4H" => Ok(Timeframe::FourHour),
            "1d" | "1D" => Ok(Timeframe::OneDay),
            "1w" | "1W" => Ok(Timeframe::OneWeek),
            other => Err(ScanRequestError::UnknownTimeframe(other.to_string())),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binance_interval())
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.binance_interval())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Timeframe::from_str(&label).map_err(serde::de::Error::custom)
    }
}
