//! Configuration for klinescan.
//!
//! Loaded from environment variables (after `.env` via `dotenvy` in the binary),
//! organized by concern: Upstream, Scan and Signal. `Config` also wires the
//! scan pipeline from those settings.

mod scan_config;
mod signal_config;
mod upstream_config;

pub use scan_config::ScanEnvConfig;
pub use signal_config::SignalEnvConfig;
pub use upstream_config::UpstreamEnvConfig;

use crate::application::indicators::IndicatorEngine;
use crate::application::market_data::{CandleSource, MarketProfile, SyntheticCandleGenerator};
use crate::application::scan::{MarketScanner, ScanScheduler};
use crate::application::signals::SignalClassifier;
use crate::domain::ports::KlineFeed;
use crate::infrastructure::binance::BinanceKlineFeed;
use crate::infrastructure::mock::UnreachableFeed;
use crate::infrastructure::observability::ScanMetrics;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Where candles come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Live,
    /// Never call upstream; every unit runs on synthetic candles
    Offline,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "offline" => Ok(Mode::Offline),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'live' or 'offline'", s),
        }
    }
}

/// Read `key` or fall back to `default`; a present but unparsable value is an error.
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub mode: Mode,
    pub upstream: UpstreamEnvConfig,
    pub scan: ScanEnvConfig,
    pub signal: SignalEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mode = env::var("MODE")
            .unwrap_or_else(|_| "live".to_string())
            .parse::<Mode>()?;

        Ok(Self {
            mode,
            upstream: UpstreamEnvConfig::from_env().context("Upstream configuration")?,
            scan: ScanEnvConfig::from_env().context("Scan configuration")?,
            signal: SignalEnvConfig::from_env().context("Signal configuration")?,
        })
    }

    pub fn kline_feed(&self) -> Arc<dyn KlineFeed> {
        match self.mode {
            Mode::Live => Arc::new(
                BinanceKlineFeed::builder()
                    .base_url(self.upstream.base_url.clone())
                    .timeout(self.upstream.timeout)
                    .build(),
            ),
            Mode::Offline => Arc::new(UnreachableFeed),
        }
    }

    /// Candle source for one exchange; only the primary exchange honours 418 backoff
    pub fn candle_source(&self, exchange: &str) -> CandleSource {
        let generator = SyntheticCandleGenerator::new(Arc::new(MarketProfile::default()));
        CandleSource::new(
            self.kline_feed(),
            Arc::new(generator),
            Arc::new(self.upstream.circuit_breaker()),
            self.upstream.backoff_for(exchange),
        )
    }

    pub fn market_scanner(
        &self,
        exchange: &str,
        metrics: Option<Arc<ScanMetrics>>,
    ) -> Result<MarketScanner> {
        let classifier = SignalClassifier::new(self.signal.thresholds()?);
        let scheduler = ScanScheduler::new(
            Arc::new(self.candle_source(exchange)),
            Arc::new(IndicatorEngine::default()),
            Arc::new(classifier),
            self.scan.scheduler.clone(),
        );

        let scanner = MarketScanner::new(scheduler, self.scan.max_symbols);
        Ok(match metrics {
            Some(metrics) => scanner.with_metrics(metrics),
            None => scanner,
        })
    }
}
