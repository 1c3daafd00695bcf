//! Scan scheduling configuration parsing from environment variables.

use super::parse_env;
use crate::application::scan::scheduler::{Grouping, SchedulerConfig};
use anyhow::{Result, bail, ensure};
use std::env;
use std::str::FromStr;
use std::time::Duration;

impl FromStr for Grouping {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unit" => Ok(Grouping::Unit),
            "symbol" => Ok(Grouping::Symbol),
            _ => bail!("Invalid SCAN_GROUPING: {}. Must be 'unit' or 'symbol'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanEnvConfig {
    pub scheduler: SchedulerConfig,
    /// Requests with more symbols are cut to the first `max_symbols`
    pub max_symbols: usize,
}

impl Default for ScanEnvConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            max_symbols: 100,
        }
    }
}

impl ScanEnvConfig {
    pub fn from_env() -> Result<Self> {
        let grouping = env::var("SCAN_GROUPING")
            .unwrap_or_else(|_| "unit".to_string())
            .parse::<Grouping>()?;

        let scheduler = SchedulerConfig {
            batch_size: parse_env("SCAN_BATCH_SIZE", 2usize)?,
            batch_delay: Duration::from_millis(parse_env("SCAN_BATCH_DELAY_MS", 2_000u64)?),
            unit_delay: Duration::from_millis(parse_env("SCAN_UNIT_DELAY_MS", 300u64)?),
            deadline: Duration::from_secs(parse_env("SCAN_DEADLINE_SECS", 60u64)?),
            candle_limit: parse_env("SCAN_CANDLE_LIMIT", 50usize)?,
            min_candles: parse_env("SCAN_MIN_CANDLES", 10usize)?,
            grouping,
        };

        ensure!(scheduler.batch_size > 0, "SCAN_BATCH_SIZE must be at least 1");
        ensure!(!scheduler.deadline.is_zero(), "SCAN_DEADLINE_SECS must be positive");
        ensure!(
            scheduler.min_candles >= 2,
            "SCAN_MIN_CANDLES must be at least 2"
        );
        ensure!(
            scheduler.candle_limit >= scheduler.min_candles,
            "SCAN_CANDLE_LIMIT ({}) must not be below SCAN_MIN_CANDLES ({})",
            scheduler.candle_limit,
            scheduler.min_candles
        );
        // Binance caps klines at 1000 per call
        ensure!(
            scheduler.candle_limit <= 1_000,
            "SCAN_CANDLE_LIMIT must be at most 1000"
        );

        Ok(Self {
            scheduler,
            max_symbols: parse_env("SCAN_MAX_SYMBOLS", 100usize)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_parse() {
        assert_eq!("unit".parse::<Grouping>().unwrap(), Grouping::Unit);
        assert_eq!(" Symbol ".parse::<Grouping>().unwrap(), Grouping::Symbol);
        assert!("batch".parse::<Grouping>().is_err());
    }
}
