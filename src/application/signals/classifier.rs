use crate::domain::indicators::{IndicatorBundle, TrendDirection};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::SignalLabel;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("signal thresholds must satisfy strong > weak > 0 (strong={strong}, weak={weak})")]
    Ordering { strong: f64, weak: f64 },

    #[error("volume ratio confirmation must be positive, got {0}")]
    VolumeRatio(f64),
}

/// Heuristic cut-offs for the decision table. Percent values.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalThresholds {
    strong_change_pct: f64,
    weak_change_pct: f64,
    volume_ratio_confirm: f64,
    strength_confirm: f64,
    timeframe_scale: HashMap<Timeframe, f64>,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            strong_change_pct: 0.5,
            weak_change_pct: 0.2,
            volume_ratio_confirm: 1.2,
            strength_confirm: 25.0,
            timeframe_scale: default_timeframe_scale(),
        }
    }
}

fn default_timeframe_scale() -> HashMap<Timeframe, f64> {
    HashMap::from([
        (Timeframe::FiveMin, 0.5),
        (Timeframe::FifteenMin, 0.75),
        (Timeframe::ThirtyMin, 0.85),
        (Timeframe::OneHour, 1.0),
        (Timeframe::FourHour, 1.5),
        (Timeframe::OneDay, 2.0),
        (Timeframe::OneWeek, 3.0),
    ])
}

impl SignalThresholds {
    pub fn new(
        strong_change_pct: f64,
        weak_change_pct: f64,
        volume_ratio_confirm: f64,
        strength_confirm: f64,
    ) -> Result<Self, ThresholdError> {
        let ordered = strong_change_pct.is_finite()
            && weak_change_pct.is_finite()
            && strong_change_pct > weak_change_pct
            && weak_change_pct > 0.0;
        if !ordered {
            return Err(ThresholdError::Ordering {
                strong: strong_change_pct,
                weak: weak_change_pct,
            });
        }
        if !(volume_ratio_confirm.is_finite() && volume_ratio_confirm > 0.0) {
            return Err(ThresholdError::VolumeRatio(volume_ratio_confirm));
        }

        Ok(Self {
            strong_change_pct,
            weak_change_pct,
            volume_ratio_confirm,
            strength_confirm,
            timeframe_scale: default_timeframe_scale(),
        })
    }

    /// Replace one timeframe's multiplier. Non-positive values are ignored so
    /// the strong > weak > 0 ordering holds on every timeframe.
    pub fn with_timeframe_scale(mut self, timeframe: Timeframe, scale: f64) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.timeframe_scale.insert(timeframe, scale);
        }
        self
    }

    fn scale(&self, timeframe: Timeframe) -> f64 {
        self.timeframe_scale.get(&timeframe).copied().unwrap_or(1.0)
    }

    /// (strong, weak) cut-offs for a timeframe
    pub fn change_cutoffs(&self, timeframe: Timeframe) -> (f64, f64) {
        let scale = self.scale(timeframe);
        (self.strong_change_pct * scale, self.weak_change_pct * scale)
    }
}

/// Maps an indicator bundle to a signal label. Stateless.
#[derive(Debug, Clone, Default)]
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Decision table:
    /// - trend up, change above strong cut-off, volume or strength confirms: STRONG_LONG
    /// - trend up, change above weak cut-off: LONG
    /// - mirrored for a down trend
    /// - otherwise NEUTRAL
    pub fn classify(&self, bundle: &IndicatorBundle, timeframe: Timeframe) -> SignalLabel {
        let (strong, weak) = self.thresholds.change_cutoffs(timeframe);
        let change = bundle.price_change_window;
        if !change.is_finite() {
            return SignalLabel::Neutral;
        }

        let confirmed = bundle.volume_ratio > self.thresholds.volume_ratio_confirm
            || bundle.adx_proxy >= self.thresholds.strength_confirm;

        match bundle.trend {
            TrendDirection::Up if change > strong && confirmed => SignalLabel::StrongLong,
            TrendDirection::Up if change > weak => SignalLabel::Long,
            TrendDirection::Down if change < -strong && confirmed => SignalLabel::StrongShort,
            TrendDirection::Down if change < -weak => SignalLabel::Short,
            _ => SignalLabel::Neutral,
        }
    }
}
