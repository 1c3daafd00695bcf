//! In-process feeds for offline runs and tests.

use crate::domain::errors::MarketDataError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::KlineFeed;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

type KlineReply = Result<Vec<Candle>, MarketDataError>;
type PriceReply = Result<f64, MarketDataError>;

/// Feed that never reaches upstream. Used by offline mode so every unit
/// degrades to synthetic candles.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableFeed;

#[async_trait]
impl KlineFeed for UnreachableFeed {
    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        debug!("UnreachableFeed: klines {} {} refused", symbol, timeframe);
        Err(MarketDataError::Transport {
            reason: "offline mode".to_string(),
        })
    }

    async fn latest_price(&self, _symbol: &str) -> Result<f64, MarketDataError> {
        Err(MarketDataError::Transport {
            reason: "offline mode".to_string(),
        })
    }
}

/// Feed answering from per-(symbol, timeframe) scripts.
///
/// Replies are consumed in order and the last one repeats forever.
/// Unscripted requests get HTTP 400, the same as an unknown symbol upstream.
#[derive(Default)]
pub struct ScriptedKlineFeed {
    klines: Mutex<HashMap<(String, Timeframe), VecDeque<KlineReply>>>,
    prices: Mutex<HashMap<String, VecDeque<PriceReply>>>,
    latency: Duration,
    kline_calls: AtomicUsize,
    price_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedKlineFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_klines(mut self, symbol: &str, timeframe: Timeframe, reply: KlineReply) -> Self {
        self.klines
            .get_mut()
            .entry((symbol.to_string(), timeframe))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_price(mut self, symbol: &str, reply: PriceReply) -> Self {
        self.prices
            .get_mut()
            .entry(symbol.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Delay applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn kline_calls(&self) -> usize {
        self.kline_calls.load(Ordering::SeqCst)
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn next_reply<T: Clone>(
    queue: Option<&mut VecDeque<Result<T, MarketDataError>>>,
) -> Option<Result<T, MarketDataError>> {
    let queue = queue?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn unknown_symbol() -> MarketDataError {
    MarketDataError::HttpStatus {
        status: 400,
        body: "{\"code\":-1121,\"msg\":\"Invalid symbol.\"}".to_string(),
    }
}

#[async_trait]
impl KlineFeed for ScriptedKlineFeed {
    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.kline_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let reply = {
            let mut scripts = self.klines.lock().await;
            next_reply(scripts.get_mut(&(symbol.to_string(), timeframe)))
        };
        self.leave();

        // Upstream returns the most recent `limit` bars
        reply.unwrap_or_else(|| Err(unknown_symbol())).map(|mut candles| {
            if candles.len() > limit {
                candles.drain(..candles.len() - limit);
            }
            candles
        })
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let reply = {
            let mut scripts = self.prices.lock().await;
            next_reply(scripts.get_mut(symbol))
        };
        self.leave();
        reply.unwrap_or_else(|| Err(unknown_symbol()))
    }
}

/// `count` candles whose closes move by `step` per bar from `start`,
/// ending at the current period of `timeframe`.
pub fn trending_candles(count: usize, timeframe: Timeframe, start: f64, step: f64) -> Vec<Candle> {
    let interval = timeframe.interval_ms();
    let last_open = timeframe.period_start(chrono::Utc::now().timestamp_millis());
    let first_open = last_open - interval * count.saturating_sub(1) as i64;

    (0..count)
        .map(|i| {
            let close = start + step * i as f64;
            let open = if i == 0 { start } else { close - step };
            let open_time = first_open + interval * i as i64;
            Candle {
                open_time,
                open,
                high: open.max(close) * 1.001,
                low: open.min(close) * 0.999,
                close,
                volume: 1_000.0,
                close_time: open_time + interval - 1,
            }
        })
        .collect()
}

/// Steadily rising closes, 1% of the start price per bar
pub fn rising_candles(count: usize, timeframe: Timeframe) -> Vec<Candle> {
    trending_candles(count, timeframe, 100.0, 1.0)
}

/// Steadily falling closes, 1% of the start price per bar
pub fn falling_candles(count: usize, timeframe: Timeframe) -> Vec<Candle> {
    trending_candles(count, timeframe, 200.0, -2.0)
}
