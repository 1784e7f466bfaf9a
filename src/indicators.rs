//! Technical indicators
//!
//! Pure functions over price/volume columns. Every function returns
//! `Option<f64>` and answers `None` for insufficient data; callers decide
//! whether a missing value blocks a check or lets it pass.

use crate::series::SeriesView;

/// Simple moving average of the trailing `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values and smoothed with `k = 2 / (period + 1)` over the remainder.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    for value in &values[period..] {
        ema = value * k + ema * (1.0 - k);
    }
    Some(ema)
}

/// Relative Strength Index over the trailing `period` changes.
///
/// Gains and losses are simple trailing averages; with no losses in the
/// window the RSI saturates at 100.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in closes[closes.len() - period - 1..].windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += -change;
        }
    }
    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// RSI evaluated at a historical bar, using only data up to and including it.
pub fn rsi_at(closes: &[f64], period: usize, index: usize) -> Option<f64> {
    if index >= closes.len() {
        return None;
    }
    rsi(&closes[..=index], period)
}

/// Average True Range: mean of the trailing `period` true ranges.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    let len = highs.len();
    if period == 0 || len != lows.len() || len != closes.len() || len < period + 1 {
        return None;
    }
    let mut sum = 0.0;
    for i in len - period..len {
        sum += true_range(highs[i], lows[i], closes[i - 1]);
    }
    Some(sum / period as f64)
}

/// Trailing series of ATR values, one per bar, newest last.
///
/// At most `lookback` values are produced; bars without `period + 1` bars of
/// history are skipped, so the result is shorter than `lookback` when the
/// input barely covers the ATR period.
pub fn atr_tail_series(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
    lookback: usize,
) -> Vec<f64> {
    let len = highs.len();
    if period == 0 || len != lows.len() || len != closes.len() || len < period + 1 {
        return Vec::new();
    }
    // tr[j] is the true range of bar j + 1
    let trs: Vec<f64> =
        (1..len).map(|i| true_range(highs[i], lows[i], closes[i - 1])).collect();
    let start = period.max(len.saturating_sub(lookback));
    (start..len)
        .map(|i| trs[i - period..i].iter().sum::<f64>() / period as f64)
        .collect()
}

#[inline]
fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low).max((high - prev_close).abs()).max((low - prev_close).abs())
}

/// Volume-weighted average price over the whole view.
///
/// Typical price is `(high + low + close) / 3`; zero total volume gives `None`.
pub fn vwap(view: &SeriesView) -> Option<f64> {
    if view.is_empty() || view.highs.len() != view.volumes.len() {
        return None;
    }
    let mut sum_tpv = 0.0;
    let mut sum_v = 0.0;
    for i in 0..view.len() {
        let typical = (view.highs[i] + view.lows[i] + view.closes[i]) / 3.0;
        sum_tpv += typical * view.volumes[i];
        sum_v += view.volumes[i];
    }
    if sum_v == 0.0 {
        return None;
    }
    Some(sum_tpv / sum_v)
}

/// Trailing average volume.
pub fn avg_volume(volumes: &[f64], period: usize) -> Option<f64> {
    sma(volumes, period)
}

/// Relative volume of the most recent bar: volume divided by the trailing
/// `period`-bar average (which includes the bar itself).
pub fn rel_vol(view: &SeriesView, period: usize) -> Option<f64> {
    let last = *view.volumes.last()?;
    let avg = avg_volume(&view.volumes, period)?;
    if avg == 0.0 {
        return None;
    }
    Some(last / avg)
}

/// Relative volume at a historical bar, against the average of the `period`
/// bars ending there. Used to measure volume *at* a swing point.
pub fn rel_vol_at(view: &SeriesView, period: usize, index: usize) -> Option<f64> {
    if index >= view.volumes.len() {
        return None;
    }
    let avg = avg_volume(&view.volumes[..=index], period)?;
    if avg == 0.0 {
        return None;
    }
    Some(view.volumes[index] / avg)
}

/// Least-squares slope of `values` against their positions `0..n`.
pub fn regression_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(volumes: Vec<f64>) -> SeriesView {
        let n = volumes.len();
        SeriesView {
            opens: vec![1.0; n],
            highs: vec![2.0; n],
            lows: vec![0.5; n],
            closes: vec![1.5; n],
            volumes,
        }
    }

    #[test]
    fn sma_uses_trailing_window() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert_eq!(sma(&[1.0], 2), None);
    }

    #[test]
    fn ema_seeds_with_sma() {
        // Seed = 2.0 over the first three, then one smoothing step with k = 0.5.
        let values = [1.0, 2.0, 3.0, 6.0];
        let ema3 = ema(&values, 3).unwrap();
        assert!((ema3 - 4.0).abs() < 1e-12);
        assert_eq!(ema(&values, 5), None);
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (0..16).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));
        let falling: Vec<f64> = (0..16).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&falling, 14).unwrap() < 1e-9);
        assert_eq!(rsi(&rising[..10], 14), None);
    }

    #[test]
    fn rsi_at_uses_only_the_prefix() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..10).map(|i| 119.0 - i as f64));
        // At bar 19 the series has only risen.
        assert_eq!(rsi_at(&closes, 14, 19), Some(100.0));
        assert!(rsi_at(&closes, 14, 29).unwrap() < 50.0);
        assert_eq!(rsi_at(&closes, 14, 99), None);
    }

    #[test]
    fn atr_is_mean_true_range() {
        let highs = vec![12.0; 16];
        let lows = vec![10.0; 16];
        let closes = vec![11.0; 16];
        assert_eq!(atr(&highs, &lows, &closes, 14), Some(2.0));
        assert_eq!(atr(&highs[..10], &lows[..10], &closes[..10], 14), None);
    }

    #[test]
    fn atr_tail_series_is_bounded_by_lookback() {
        let n = 60;
        let highs = vec![12.0; n];
        let lows = vec![10.0; n];
        let closes = vec![11.0; n];
        let tail = atr_tail_series(&highs, &lows, &closes, 14, 20);
        assert_eq!(tail.len(), 20);
        assert!(tail.iter().all(|v| (v - 2.0).abs() < 1e-12));

        let short = atr_tail_series(&highs[..16], &lows[..16], &closes[..16], 14, 20);
        assert_eq!(short.len(), 2);
    }

    #[test]
    fn vwap_weights_by_volume() {
        let mut v = view(vec![1.0, 3.0]);
        v.highs = vec![10.0, 20.0];
        v.lows = vec![10.0, 20.0];
        v.closes = vec![10.0, 20.0];
        // Typical prices 10 and 20, weights 1 and 3.
        assert_eq!(vwap(&v), Some(17.5));
        assert_eq!(vwap(&view(vec![0.0, 0.0])), None);
    }

    #[test]
    fn rel_vol_against_trailing_average() {
        let mut volumes = vec![100.0; 19];
        volumes.push(290.0);
        // Average = (19 * 100 + 290) / 20 = 104.5
        let rv = rel_vol(&view(volumes), 20).unwrap();
        assert!((rv - 290.0 / 104.5).abs() < 1e-12);
        assert_eq!(rel_vol(&view(vec![100.0; 10]), 20), None);
    }

    #[test]
    fn rel_vol_at_historical_bar() {
        let mut volumes = vec![100.0; 25];
        volumes[21] = 300.0;
        let v = view(volumes);
        let rv = rel_vol_at(&v, 20, 21).unwrap();
        let avg = (19.0 * 100.0 + 300.0) / 20.0;
        assert!((rv - 300.0 / avg).abs() < 1e-12);
        // Not enough history at bar 10.
        assert_eq!(rel_vol_at(&v, 20, 10), None);
        assert_eq!(rel_vol_at(&v, 20, 99), None);
    }

    #[test]
    fn regression_slope_of_a_line() {
        let values: Vec<f64> = (0..8).map(|i| 3.0 + 2.0 * i as f64).collect();
        assert!((regression_slope(&values).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(regression_slope(&[1.0]), None);
    }
}
