use serde::{Deserialize, Serialize};

/// Coarse trading session derived from the UTC hour ("killzone")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionTag {
    #[serde(rename = "Asian")]
    Asian,
    #[serde(rename = "London")]
    London,
    #[serde(rename = "NY_AM")]
    NewYorkAm,
    #[serde(rename = "NY_PM")]
    NewYorkPm,
}

/// Short/long moving-average alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

/// Indicators derived from one candle window. Recomputed on every scan.
///
/// Percent fields are expressed in percent (1.5 == 1.5%), not fractions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorBundle {
    /// Average true range as percent of the last close, timeframe-scaled
    pub atr: f64,
    /// Directional-movement strength proxy, clamped to [0, 60]
    #[serde(rename = "adx")]
    pub adx_proxy: f64,
    /// Std-dev of simple returns in percent, capped
    pub volatility: f64,
    pub supply_zones: u32,
    pub demand_zones: u32,
    pub fair_value_gap_bullish: u32,
    pub fair_value_gap_bearish: u32,
    /// Close-to-close change across the whole window, percent
    pub price_change_window: f64,
    /// Last volume over the window's mean volume
    pub volume_ratio: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub trend: TrendDirection,
    #[serde(rename = "killzone")]
    pub session_tag: Option<SessionTag>,
}

impl IndicatorBundle {
    /// Bundle returned when the window cannot support the math
    pub fn neutral(session_tag: Option<SessionTag>) -> Self {
        Self {
            volume_ratio: 1.0,
            session_tag,
            ..Self::default()
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.atr,
            self.adx_proxy,
            self.volatility,
            self.price_change_window,
            self.volume_ratio,
            self.sma_fast,
            self.sma_slow,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
