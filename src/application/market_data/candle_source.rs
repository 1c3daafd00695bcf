//! Candle Source
//!
//! Wraps a raw [`KlineFeed`] with the per-unit failure policy:
//! - 429: back off, retry once, then give up on the unit
//! - 418 (primary exchange only): long back off, retry once, then give up
//! - upstream unreachable (timeout, transport, 5xx): synthetic candles
//! - anything else (bad symbol, malformed payload): give up on the unit
//!
//! Synthetic series carry `Provenance::Synthetic` so callers can tell them apart.

use crate::application::market_data::synthetic::SyntheticCandleGenerator;
use crate::domain::errors::{BackoffSchedule, FailureClass, MarketDataError};
use crate::domain::market::candle::CandleSeries;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::KlineFeed;
use crate::infrastructure::core::circuit_breaker::CircuitBreaker;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One initial call plus one retry
const MAX_ATTEMPTS: usize = 2;

/// Where a price quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Ticker,
    /// Static reference table, upstream did not answer
    LastKnown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price: f64,
    pub source: QuoteSource,
}

pub struct CandleSource {
    feed: Arc<dyn KlineFeed>,
    synthetic: Arc<SyntheticCandleGenerator>,
    breaker: Arc<CircuitBreaker>,
    backoff: BackoffSchedule,
}

impl CandleSource {
    pub fn new(
        feed: Arc<dyn KlineFeed>,
        synthetic: Arc<SyntheticCandleGenerator>,
        breaker: Arc<CircuitBreaker>,
        backoff: BackoffSchedule,
    ) -> Self {
        Self {
            feed,
            synthetic,
            breaker,
            backoff,
        }
    }

    /// Fetch the most recent `limit` candles, degrading to synthetic data when
    /// upstream is unavailable. `Err` means the unit should produce no result.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, MarketDataError> {
        if !self.breaker.allow_request().await {
            debug!(
                "CandleSource: Circuit open, serving synthetic {} {} candles",
                symbol, timeframe
            );
            return Ok(self.synthetic.generate(symbol, timeframe, limit));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.feed.klines(symbol, timeframe, limit).await {
                Ok(candles) => {
                    self.breaker.record_success().await;
                    debug!(
                        "CandleSource: Fetched {} {} candles for {}",
                        candles.len(),
                        timeframe,
                        symbol
                    );
                    return Ok(CandleSeries::live(symbol, timeframe, candles));
                }
                Err(err) => err,
            };

            self.record_outcome(&err).await;

            match err.failure_class(&self.backoff) {
                FailureClass::Retryable { backoff } if attempt < MAX_ATTEMPTS => {
                    warn!(
                        "CandleSource: {} for {} {} (attempt {}/{}), retrying in {:?}",
                        err, symbol, timeframe, attempt, MAX_ATTEMPTS, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                FailureClass::Retryable { .. } => {
                    warn!(
                        "CandleSource: {} for {} {} after {} attempts, dropping unit",
                        err, symbol, timeframe, attempt
                    );
                    return Err(err);
                }
                FailureClass::Degrade => {
                    warn!(
                        "CandleSource: {} for {} {}, falling back to synthetic candles",
                        err, symbol, timeframe
                    );
                    return Ok(self.synthetic.generate(symbol, timeframe, limit));
                }
                FailureClass::Drop => {
                    info!(
                        "CandleSource: {} for {} {}, dropping unit",
                        err, symbol, timeframe
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Latest traded price with the same retry-once policy as [`fetch`](Self::fetch).
    /// Falls back to the static reference table; errors only when the symbol
    /// is unknown there too.
    pub async fn fetch_latest_price(&self, symbol: &str) -> Result<PriceQuote, MarketDataError> {
        if self.breaker.allow_request().await {
            let mut attempt = 0;
            loop {
                attempt += 1;
                let err = match self.feed.latest_price(symbol).await {
                    Ok(price) if price.is_finite() && price > 0.0 => {
                        self.breaker.record_success().await;
                        return Ok(PriceQuote {
                            price,
                            source: QuoteSource::Ticker,
                        });
                    }
                    Ok(price) => MarketDataError::MalformedPayload {
                        symbol: symbol.to_string(),
                        reason: format!("non-positive price {}", price),
                    },
                    Err(err) => err,
                };

                self.record_outcome(&err).await;

                match err.failure_class(&self.backoff) {
                    FailureClass::Retryable { backoff } if attempt < MAX_ATTEMPTS => {
                        warn!(
                            "CandleSource: {} fetching price for {}, retrying in {:?}",
                            err, symbol, backoff
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    _ => {
                        warn!("CandleSource: Price fetch for {} failed: {}", symbol, err);
                        break;
                    }
                }
            }
        }

        self.synthetic
            .profile()
            .known_price(symbol)
            .map(|price| PriceQuote {
                price,
                source: QuoteSource::LastKnown,
            })
            .ok_or_else(|| MarketDataError::NoPriceAvailable {
                symbol: symbol.to_string(),
            })
    }

    async fn record_outcome(&self, err: &MarketDataError) {
        // Any HTTP answer other than 5xx proves upstream is reachable
        if err.is_unavailability() {
            self.breaker.record_failure().await;
        } else {
            self.breaker.record_success().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::profile::MarketProfile;
    use crate::domain::market::candle::{Candle, Provenance};
    use crate::infrastructure::core::circuit_breaker::CircuitState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct QueueFeed {
        klines: Mutex<VecDeque<Result<Vec<Candle>, MarketDataError>>>,
        prices: Mutex<VecDeque<Result<f64, MarketDataError>>>,
        calls: AtomicUsize,
    }

    impl QueueFeed {
        fn new(
            klines: Vec<Result<Vec<Candle>, MarketDataError>>,
            prices: Vec<Result<f64, MarketDataError>>,
        ) -> Self {
            Self {
                klines: Mutex::new(klines.into()),
                prices: Mutex::new(prices.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KlineFeed for QueueFeed {
        async fn klines(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.klines
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(MarketDataError::Transport {
                    reason: "script exhausted".to_string(),
                }))
        }

        async fn latest_price(&self, _symbol: &str) -> Result<f64, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prices
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(MarketDataError::Transport {
                    reason: "script exhausted".to_string(),
                }))
        }
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                open_time: i as i64 * 3_600_000,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 5.0,
                close_time: i as i64 * 3_600_000 + 3_599_999,
            })
            .collect()
    }

    fn source(feed: Arc<QueueFeed>, honor_ban: bool) -> (CandleSource, Arc<CircuitBreaker>) {
        let breaker = Arc::new(CircuitBreaker::new(
            "test",
            3,
            1,
            Duration::from_secs(60),
        ));
        let source = CandleSource::new(
            feed,
            Arc::new(SyntheticCandleGenerator::with_seed(
                Arc::new(MarketProfile::default()),
                9,
            )),
            breaker.clone(),
            BackoffSchedule {
                rate_limit: Duration::from_millis(5),
                ban: Duration::from_millis(10),
                honor_ban,
            },
        );
        (source, breaker)
    }

    #[tokio::test]
    async fn test_live_candles_pass_through() {
        let feed = Arc::new(QueueFeed::new(vec![Ok(candles(12))], vec![]));
        let (source, _) = source(feed.clone(), true);

        let series = source.fetch("BTCUSDT", Timeframe::OneHour, 12).await.unwrap();
        assert_eq!(series.provenance, Provenance::Live);
        assert_eq!(series.len(), 12);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_once_then_succeeds() {
        let feed = Arc::new(QueueFeed::new(
            vec![Err(MarketDataError::RateLimited), Ok(candles(10))],
            vec![],
        ));
        let (source, _) = source(feed.clone(), true);

        let series = source.fetch("ETHUSDT", Timeframe::FourHour, 10).await.unwrap();
        assert!(!series.is_synthetic());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_rate_limit_drops_unit() {
        let feed = Arc::new(QueueFeed::new(
            vec![
                Err(MarketDataError::RateLimited),
                Err(MarketDataError::RateLimited),
                Ok(candles(10)),
            ],
            vec![],
        ));
        let (source, _) = source(feed.clone(), true);

        let result = source.fetch("ETHUSDT", Timeframe::OneHour, 10).await;
        assert_eq!(result, Err(MarketDataError::RateLimited));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ban_only_retried_on_primary_exchange() {
        let feed = Arc::new(QueueFeed::new(
            vec![Err(MarketDataError::TemporarilyBanned), Ok(candles(10))],
            vec![],
        ));
        let (primary, _) = source(feed.clone(), true);
        assert!(!primary.fetch("BTCUSDT", Timeframe::OneHour, 10).await.unwrap().is_synthetic());

        let feed = Arc::new(QueueFeed::new(
            vec![Err(MarketDataError::TemporarilyBanned)],
            vec![],
        ));
        let (secondary, _) = source(feed.clone(), false);
        let series = secondary.fetch("BTCUSDT", Timeframe::OneHour, 10).await.unwrap();
        assert!(series.is_synthetic());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_degrades_to_synthetic() {
        let feed = Arc::new(QueueFeed::new(
            vec![Err(MarketDataError::Timeout { duration_ms: 12_000 })],
            vec![],
        ));
        let (source, _) = source(feed, true);

        let series = source.fetch("SOLUSDT", Timeframe::OneDay, 30).await.unwrap();
        assert!(series.is_synthetic());
        assert_eq!(series.len(), 30);
    }

    #[tokio::test]
    async fn test_bad_symbol_is_dropped_without_retry() {
        let feed = Arc::new(QueueFeed::new(
            vec![Err(MarketDataError::HttpStatus {
                status: 400,
                body: "Invalid symbol.".to_string(),
            })],
            vec![],
        ));
        let (source, _) = source(feed.clone(), true);

        let result = source.fetch("NOPEUSDT", Timeframe::OneHour, 10).await;
        assert!(matches!(result, Err(MarketDataError::HttpStatus { status: 400, .. })));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_upstream() {
        let feed = Arc::new(QueueFeed::new(vec![], vec![]));
        let (source, breaker) = source(feed.clone(), true);

        for _ in 0..3 {
            let series = source.fetch("BTCUSDT", Timeframe::OneHour, 10).await.unwrap();
            assert!(series.is_synthetic());
        }
        assert_eq!(breaker.state().await, CircuitState::Open);
        let calls_before = feed.calls.load(Ordering::SeqCst);

        let series = source.fetch("BTCUSDT", Timeframe::OneHour, 10).await.unwrap();
        assert!(series.is_synthetic());
        assert_eq!(feed.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn test_price_quote_fallbacks() {
        let feed = Arc::new(QueueFeed::new(
            vec![],
            vec![
                Err(MarketDataError::RateLimited),
                Ok(64_123.5),
                Err(MarketDataError::RateLimited),
                Err(MarketDataError::RateLimited),
            ],
        ));
        let (source, _) = source(feed, true);

        let quote = source.fetch_latest_price("BTCUSDT").await.unwrap();
        assert_eq!(quote.source, QuoteSource::Ticker);
        assert_eq!(quote.price, 64_123.5);

        let quote = source.fetch_latest_price("BTCUSDT").await.unwrap();
        assert_eq!(quote.source, QuoteSource::LastKnown);
        assert_eq!(quote.price, 65_000.0);

        let missing = source.fetch_latest_price("NOPEUSDT").await;
        assert!(matches!(missing, Err(MarketDataError::NoPriceAvailable { .. })));
    }
}
