//! Swing point extraction
//!
//! A swing high at bar `i` is a value that is at least every value in the
//! closed window `[i - w, i + w]`; ties qualify, so a flat-topped extreme is
//! still a swing. Swing lows mirror with `<=`. Points are produced fresh per
//! call and never cached.

/// A local extremum with the index of the bar it occurred on.
///
/// The index lets detectors measure volume or RSI *at* the swing bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub index: usize,
    pub value: f64,
}

/// Swing highs of `values` with bar indices, window `w` on each side.
///
/// Needs at least `2w + 1` values; shorter input yields an empty vec.
pub fn swing_highs_indexed(values: &[f64], window: usize) -> Vec<SwingPoint> {
    extrema(values, window, |candidate, neighbor| neighbor <= candidate)
}

/// Swing lows of `values` with bar indices.
pub fn swing_lows_indexed(values: &[f64], window: usize) -> Vec<SwingPoint> {
    extrema(values, window, |candidate, neighbor| neighbor >= candidate)
}

/// Swing high values only.
pub fn swing_highs(values: &[f64], window: usize) -> Vec<f64> {
    swing_highs_indexed(values, window).into_iter().map(|p| p.value).collect()
}

/// Swing low values only.
pub fn swing_lows(values: &[f64], window: usize) -> Vec<f64> {
    swing_lows_indexed(values, window).into_iter().map(|p| p.value).collect()
}

fn extrema(values: &[f64], window: usize, dominates: impl Fn(f64, f64) -> bool) -> Vec<SwingPoint> {
    let len = values.len();
    if len < 2 * window + 1 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for i in window..len - window {
        let mid = values[i];
        let is_extremum = (i - window..=i + window).all(|j| j == i || dominates(mid, values[j]));
        if is_extremum {
            out.push(SwingPoint { index: i, value: mid });
        }
    }
    out
}
