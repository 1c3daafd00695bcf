//! Indicator Engine
//!
//! Turns one candle window into an [`IndicatorBundle`]. Total: short windows,
//! zero prices and NaN paths all resolve to documented defaults instead of
//! failing the scan unit.

use crate::application::indicators::atr::average_true_range_pct;
use crate::application::indicators::directional::directional_strength;
use crate::application::indicators::session::session_at;
use crate::application::indicators::structure::{fair_value_gaps, zone_counts};
use crate::application::indicators::volatility::return_volatility_pct;
use crate::domain::indicators::{IndicatorBundle, TrendDirection};
use crate::domain::market::candle::CandleSeries;
use crate::domain::market::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Relative gap between the two averages below which the trend is flat
const TREND_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub atr_period: usize,
    pub volatility_window: usize,
    pub volatility_cap_pct: f64,
    pub strength_cap: f64,
    pub zone_lookback: usize,
    pub zone_cap: u32,
    pub gap_scan_bars: usize,
    pub gap_cap: u32,
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    /// Longer timeframes scale ATR up so values compare across resolutions
    pub atr_multipliers: HashMap<Timeframe, f64>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let atr_multipliers = HashMap::from([
            (Timeframe::FiveMin, 0.8),
            (Timeframe::FifteenMin, 0.9),
            (Timeframe::ThirtyMin, 0.95),
            (Timeframe::OneHour, 1.0),
            (Timeframe::FourHour, 1.2),
            (Timeframe::OneDay, 1.5),
            (Timeframe::OneWeek, 2.0),
        ]);

        Self {
            atr_period: 14,
            volatility_window: 20,
            volatility_cap_pct: 10.0,
            strength_cap: 60.0,
            zone_lookback: 20,
            zone_cap: 5,
            gap_scan_bars: 10,
            gap_cap: 3,
            sma_fast_period: 5,
            sma_slow_period: 20,
            atr_multipliers,
        }
    }
}

impl IndicatorConfig {
    pub fn atr_multiplier(&self, timeframe: Timeframe) -> f64 {
        self.atr_multipliers.get(&timeframe).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn compute(&self, series: &CandleSeries) -> IndicatorBundle {
        self.compute_at(series, Utc::now())
    }

    /// Same as [`compute`](Self::compute) with an explicit clock for the session tag
    pub fn compute_at(&self, series: &CandleSeries, now: DateTime<Utc>) -> IndicatorBundle {
        let session_tag = session_at(now);
        let candles = &series.candles;
        if candles.len() < 2 {
            return IndicatorBundle::neutral(session_tag);
        }

        let cfg = &self.config;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let atr = average_true_range_pct(candles, cfg.atr_period)
            .map(|atr| atr * cfg.atr_multiplier(series.timeframe))
            .unwrap_or(0.0);
        let volatility = return_volatility_pct(&closes, cfg.volatility_window, cfg.volatility_cap_pct)
            .unwrap_or(0.0);
        let adx_proxy = directional_strength(candles, cfg.strength_cap);
        let zones = zone_counts(candles, cfg.zone_lookback, cfg.zone_cap);
        let gaps = fair_value_gaps(candles, cfg.gap_scan_bars, cfg.gap_cap);

        let sma_fast = last_sma(&closes, cfg.sma_fast_period);
        let sma_slow = last_sma(&closes, cfg.sma_slow_period);

        IndicatorBundle {
            atr: finite_or(atr, 0.0),
            adx_proxy: finite_or(adx_proxy, 0.0),
            volatility: finite_or(volatility, 0.0),
            supply_zones: zones.supply,
            demand_zones: zones.demand,
            fair_value_gap_bullish: gaps.bullish,
            fair_value_gap_bearish: gaps.bearish,
            price_change_window: finite_or(window_change_pct(&closes), 0.0),
            volume_ratio: finite_or(last_volume_ratio(series), 1.0),
            sma_fast: finite_or(sma_fast, 0.0),
            sma_slow: finite_or(sma_slow, 0.0),
            trend: trend_direction(sma_fast, sma_slow),
            session_tag,
        }
    }
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

/// Last value of a simple moving average fed with every close.
/// Fewer closes than `period` average over what is available.
fn last_sma(closes: &[f64], period: usize) -> f64 {
    let Ok(mut sma) = SimpleMovingAverage::new(period.max(1)) else {
        return closes.last().copied().unwrap_or(0.0);
    };
    closes.iter().fold(0.0, |_, &close| sma.next(close))
}

fn window_change_pct(closes: &[f64]) -> f64 {
    match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}

fn last_volume_ratio(series: &CandleSeries) -> f64 {
    let volumes: Vec<f64> = series.candles.iter().map(|c| c.volume).collect();
    let mean = volumes.iter().sum::<f64>() / volumes.len().max(1) as f64;
    match volumes.last() {
        Some(&last) if mean > 0.0 => last / mean,
        _ => 1.0,
    }
}

fn trend_direction(fast: f64, slow: f64) -> TrendDirection {
    if !fast.is_finite() || !slow.is_finite() || slow <= 0.0 {
        return TrendDirection::Flat;
    }
    let gap = (fast - slow) / slow;
    if gap > TREND_EPSILON {
        TrendDirection::Up
    } else if gap < -TREND_EPSILON {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}
