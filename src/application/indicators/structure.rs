//! Price-structure counts: swing zones and fair value gaps.

use crate::domain::market::candle::Candle;

/// Counts of swing highs (supply) and swing lows (demand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneCounts {
    pub supply: u32,
    pub demand: u32,
}

/// Counts of three-bar imbalances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GapCounts {
    pub bullish: u32,
    pub bearish: u32,
}

/// Local extrema over the last `lookback` bars.
///
/// A supply zone is a high strictly above both neighbours; a demand zone is a
/// low strictly below both neighbours. Each count is capped at `cap`.
pub fn zone_counts(candles: &[Candle], lookback: usize, cap: u32) -> ZoneCounts {
    let start = candles.len().saturating_sub(lookback);
    let recent = &candles[start..];

    let mut counts = ZoneCounts::default();
    for w in recent.windows(3) {
        let (left, mid, right) = (&w[0], &w[1], &w[2]);
        if mid.high > left.high && mid.high > right.high {
            counts.supply += 1;
        }
        if mid.low < left.low && mid.low < right.low {
            counts.demand += 1;
        }
    }

    counts.supply = counts.supply.min(cap);
    counts.demand = counts.demand.min(cap);
    counts
}

/// Fair value gaps among the first `scan_bars` bars of the window.
///
/// Bullish: a bar's low is above the high two bars earlier.
/// Bearish: a bar's high is below the low two bars earlier.
/// Each count is capped at `cap`.
pub fn fair_value_gaps(candles: &[Candle], scan_bars: usize, cap: u32) -> GapCounts {
    let end = candles.len().min(scan_bars);
    let scanned = &candles[..end];

    let mut counts = GapCounts::default();
    for w in scanned.windows(3) {
        let (first, third) = (&w[0], &w[2]);
        if third.low > first.high {
            counts.bullish += 1;
        }
        if third.high < first.low {
            counts.bearish += 1;
        }
    }

    counts.bullish = counts.bullish.min(cap);
    counts.bearish = counts.bearish.min(cap);
    counts
}
