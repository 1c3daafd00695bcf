use crate::application::indicators::atr::true_range;
use crate::domain::market::candle::Candle;

/// Simplified directional-movement strength over the whole window.
///
/// Sums +DM, -DM and true range across all steps (no Wilder smoothing), forms
/// the two directional indices and returns DX = 100 * |+DI - -DI| / (+DI + -DI)
/// clamped to `[0, cap]`. This is a trend-strength proxy, not a certified ADX.
pub fn directional_strength(candles: &[Candle], cap: f64) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }

    let mut tr_sum = 0.0;
    let mut plus_dm_sum = 0.0;
    let mut minus_dm_sum = 0.0;

    for pair in candles.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;
        if up_move > down_move && up_move > 0.0 {
            plus_dm_sum += up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm_sum += down_move;
        }
        tr_sum += true_range(curr, prev.close);
    }

    if tr_sum <= 0.0 {
        return 0.0;
    }

    let plus_di = 100.0 * plus_dm_sum / tr_sum;
    let minus_di = 100.0 * minus_dm_sum / tr_sum;
    let sum_di = plus_di + minus_di;
    if sum_di <= 0.0 {
        return 0.0;
    }

    let dx = 100.0 * (plus_di - minus_di).abs() / sum_di;
    if dx.is_finite() {
        dx.clamp(0.0, cap.max(0.0))
    } else {
        0.0
    }
}
