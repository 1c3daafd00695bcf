use statrs::statistics::Statistics;

/// Short-window volatility in percent.
///
/// Population standard deviation of simple returns over the last `window`
/// closes (or all of them if fewer), multiplied by 100 and capped at `cap_pct`.
/// Returns `None` when no valid return can be formed.
pub fn return_volatility_pct(closes: &[f64], window: usize, cap_pct: f64) -> Option<f64> {
    let start = closes.len().saturating_sub(window.max(2));
    let recent = &closes[start..];

    let returns: Vec<f64> = recent
        .windows(2)
        .filter(|pair| pair[0] > 0.0 && pair[1].is_finite())
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    if returns.is_empty() {
        return None;
    }

    let std_dev = returns.iter().population_std_dev();
    if !std_dev.is_finite() {
        return None;
    }

    Some((std_dev * 100.0).min(cap_pct))
}
