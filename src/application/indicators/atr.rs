use crate::domain::market::candle::Candle;

/// True range of `current` against the previous close
pub fn true_range(current: &Candle, prev_close: f64) -> f64 {
    (current.high - current.low)
        .max((current.high - prev_close).abs())
        .max((current.low - prev_close).abs())
}

/// Simple average of the last `min(period, len - 1)` true ranges, as a
/// percentage of the latest close.
///
/// Returns `None` with fewer than two candles or a non-positive last close.
pub fn average_true_range_pct(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < 2 || period == 0 {
        return None;
    }

    let start = 1.max(candles.len().saturating_sub(period));
    let steps = candles.len() - start;
    let sum: f64 = (start..candles.len())
        .map(|i| true_range(&candles[i], candles[i - 1].close))
        .sum();

    let last_close = candles.last()?.close;
    if last_close <= 0.0 {
        return None;
    }

    let pct = (sum / steps as f64) / last_close * 100.0;
    pct.is_finite().then_some(pct)
}
