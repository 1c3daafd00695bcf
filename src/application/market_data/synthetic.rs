//! Synthetic candle generator
//!
//! Produces a randomized walk ending near the symbol's reference price. Used
//! only when the upstream exchange cannot be reached, so a scan unit degrades
//! to flagged synthetic data instead of disappearing.

use crate::application::market_data::profile::MarketProfile;
use crate::domain::market::candle::{Candle, CandleSeries};
use crate::domain::market::timeframe::Timeframe;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

const BASE_VOLUME: f64 = 1_000.0;

pub struct SyntheticCandleGenerator {
    profile: Arc<MarketProfile>,
    rng: Mutex<StdRng>,
}

impl SyntheticCandleGenerator {
    /// Generator seeded from OS entropy; output is not reproducible
    pub fn new(profile: Arc<MarketProfile>) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
        }
    }

    /// Deterministic generator for tests and replays
    pub fn with_seed(profile: Arc<MarketProfile>, seed: u64) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn profile(&self) -> &MarketProfile {
        &self.profile
    }

    pub fn generate(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> CandleSeries {
        self.generate_at(symbol, timeframe, limit, Utc::now().timestamp_millis())
    }

    /// Builds `limit` candles whose last one contains `now_ms`.
    ///
    /// Closes are walked backward from the reference price with per-step
    /// multiplicative noise in `[-vol, +vol]`; each open is the previous close.
    pub fn generate_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        now_ms: i64,
    ) -> CandleSeries {
        if limit == 0 {
            return CandleSeries::synthetic(symbol, timeframe, Vec::new());
        }

        let reference = self.profile.reference_price(symbol);
        let vol = self.profile.volatility(symbol);
        let interval = timeframe.interval_ms();
        let last_open = timeframe.period_start(now_ms);

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut closes = vec![reference; limit];
        for i in (1..limit).rev() {
            let step: f64 = rng.random_range(-vol..=vol);
            closes[i - 1] = closes[i] / (1.0 + step);
        }
        let first_step: f64 = rng.random_range(-vol..=vol);
        let first_open = closes[0] / (1.0 + first_step);

        let mut candles = Vec::with_capacity(limit);
        for (i, &close) in closes.iter().enumerate() {
            let open = if i == 0 { first_open } else { closes[i - 1] };
            let upper_wick: f64 = rng.random_range(0.0..=vol / 2.0);
            let lower_wick: f64 = rng.random_range(0.0..=vol / 2.0);
            let volume: f64 = BASE_VOLUME * rng.random_range(0.5..=1.5);

            let open_time = last_open - (limit - 1 - i) as i64 * interval;
            candles.push(Candle {
                open_time,
                open,
                high: open.max(close) * (1.0 + upper_wick),
                low: open.min(close) * (1.0 - lower_wick),
                close,
                volume,
                close_time: open_time + interval - 1,
            });
        }

        debug!(
            "SyntheticCandleGenerator: {} {} candles for {} (ref {:.4}, vol {:.3})",
            limit, timeframe, symbol, reference, vol
        );

        CandleSeries::synthetic(symbol, timeframe, candles)
    }
}
