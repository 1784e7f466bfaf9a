//! Fibonacci confluence levels
//!
//! Retracement levels drawn from a swing low to a swing high. Confluence
//! only: a price sitting on a retracement is never a signal by itself, it
//! feeds the engulfing detector's level inputs and the observability report.

use serde::Serialize;

use crate::series::SeriesView;

/// The retracement ratios that matter: 38.2%, 50%, 61.8%.
pub const FIB_RATIOS: [f64; 3] = [0.382, 0.5, 0.618];

/// One retracement level, measured down from the swing high.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Retracement {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels between explicit swing anchors, falling back to the
/// series extremes when anchors are not supplied. Needs at least two bars.
pub fn retracement_levels(
    view: &SeriesView,
    swing_low: Option<f64>,
    swing_high: Option<f64>,
) -> Option<Vec<Retracement>> {
    let (low, high) = anchors(view, swing_low, swing_high)?;
    let range = high - low;
    Some(
        FIB_RATIOS
            .iter()
            .map(|&ratio| Retracement { ratio, price: high - range * ratio })
            .collect(),
    )
}

/// The 61.8% retracement, the level the engulfing detector accepts as
/// support confluence.
pub fn golden_retracement(
    view: &SeriesView,
    swing_low: Option<f64>,
    swing_high: Option<f64>,
) -> Option<f64> {
    retracement_levels(view, swing_low, swing_high)?
        .into_iter()
        .find(|r| r.ratio == 0.618)
        .map(|r| r.price)
}

/// Whether `price` sits within `tolerance` (a fraction of the swing range) of
/// any retracement level.
pub fn price_at_level(
    view: &SeriesView,
    price: f64,
    swing_low: Option<f64>,
    swing_high: Option<f64>,
    tolerance: f64,
) -> bool {
    let Some((low, high)) = anchors(view, swing_low, swing_high) else {
        return false;
    };
    let range = high - low;
    if range == 0.0 {
        return false;
    }
    FIB_RATIOS
        .iter()
        .any(|&ratio| ((price - (high - range * ratio)) / range).abs() < tolerance)
}

fn anchors(
    view: &SeriesView,
    swing_low: Option<f64>,
    swing_high: Option<f64>,
) -> Option<(f64, f64)> {
    match (swing_low, swing_high) {
        (Some(low), Some(high)) => Some((low, high)),
        _ => {
            if view.lows.len() < 2 || view.highs.len() < 2 {
                return None;
            }
            let low = swing_low.or_else(|| min(&view.lows))?;
            let high = swing_high.or_else(|| max(&view.highs))?;
            Some((low, high))
        }
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(highs: Vec<f64>, lows: Vec<f64>) -> SeriesView {
        let n = highs.len();
        SeriesView {
            opens: vec![0.0; n],
            highs,
            lows,
            closes: vec![0.0; n],
            volumes: vec![0.0; n],
        }
    }

    #[test]
    fn levels_from_explicit_anchors() {
        let v = view(vec![], vec![]);
        let levels = retracement_levels(&v, Some(100.0), Some(200.0)).unwrap();
        assert_eq!(levels.len(), 3);
        assert!((levels[0].price - 161.8).abs() < 1e-9);
        assert!((levels[1].price - 150.0).abs() < 1e-9);
        assert!((levels[2].price - 138.2).abs() < 1e-9);
    }

    #[test]
    fn anchors_fall_back_to_series_extremes() {
        let v = view(vec![110.0, 200.0, 150.0], vec![100.0, 120.0, 105.0]);
        let golden = golden_retracement(&v, None, None).unwrap();
        assert!((golden - (200.0 - 100.0 * 0.618)).abs() < 1e-9);
    }

    #[test]
    fn too_short_series_without_anchors_yields_none() {
        let v = view(vec![110.0], vec![100.0]);
        assert!(retracement_levels(&v, None, None).is_none());
        assert!(retracement_levels(&v, Some(100.0), Some(110.0)).is_some());
    }

    #[test]
    fn price_at_level_within_tolerance() {
        let v = view(vec![], vec![]);
        // Range 100: the 50% level is 150, tolerance 0.5% of range = 0.5.
        assert!(price_at_level(&v, 150.3, Some(100.0), Some(200.0), 0.005));
        assert!(!price_at_level(&v, 155.0, Some(100.0), Some(200.0), 0.005));
        assert!(!price_at_level(&v, 150.0, Some(100.0), Some(100.0), 0.005));
    }
}
