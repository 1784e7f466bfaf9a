//! Geometry helpers shared across the pattern families.

use crate::swing::SwingPoint;

/// Highest swing point strictly between two bar indices.
pub fn highest_between(points: &[SwingPoint], after: usize, before: usize) -> Option<SwingPoint> {
    points
        .iter()
        .filter(|p| p.index > after && p.index < before)
        .copied()
        .max_by(|a, b| a.value.total_cmp(&b.value))
}

/// Lowest swing point strictly between two bar indices.
pub fn lowest_between(points: &[SwingPoint], after: usize, before: usize) -> Option<SwingPoint> {
    points
        .iter()
        .filter(|p| p.index > after && p.index < before)
        .copied()
        .min_by(|a, b| a.value.total_cmp(&b.value))
}

/// Neckline value at `at_index`, linearly interpolated through two swing
/// points. Two equal anchors give a horizontal neckline.
pub fn neckline_at(first: SwingPoint, second: SwingPoint, at_index: usize) -> f64 {
    if first.value == second.value || second.index == first.index {
        return second.value;
    }
    let slope = (second.value - first.value) / (second.index as f64 - first.index as f64);
    first.value + slope * (at_index as f64 - first.index as f64)
}

/// Mean of the trailing `count` values, provided every one of them sits
/// within `tolerance` (relative) of that mean, i.e. a flat support or
/// resistance
/// line. Needs at least four values overall.
pub fn flat_level(values: &[f64], count: usize, tolerance: f64) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }
    let recent = tail(values, count);
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    if mean == 0.0 {
        return None;
    }
    if recent.iter().any(|v| ((v - mean) / mean).abs() > tolerance) {
        return None;
    }
    Some(mean)
}

/// The trailing `count` values (or all of them when shorter).
pub fn tail(values: &[f64], count: usize) -> &[f64] {
    &values[values.len().saturating_sub(count)..]
}

/// Minimum of the trailing `count` values.
pub fn tail_min(values: &[f64], count: usize) -> Option<f64> {
    tail(values, count).iter().copied().reduce(f64::min)
}

/// Maximum of the trailing `count` values.
pub fn tail_max(values: &[f64], count: usize) -> Option<f64> {
    tail(values, count).iter().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(index: usize, value: f64) -> SwingPoint {
        SwingPoint { index, value }
    }

    #[test]
    fn between_filters_are_strict() {
        let points = [point(2, 10.0), point(5, 14.0), point(8, 12.0)];
        assert_eq!(highest_between(&points, 2, 8).unwrap().index, 5);
        assert_eq!(lowest_between(&points, 2, 8).unwrap().index, 5);
        // Endpoints excluded.
        assert!(highest_between(&points, 5, 8).is_none());
    }

    #[test]
    fn neckline_interpolates_to_the_target_bar() {
        let a = point(4, 100.0);
        let b = point(8, 104.0);
        // Slope 1 per bar, projected to bar 12.
        assert!((neckline_at(a, b, 12) - 108.0).abs() < 1e-12);
        // Horizontal when anchors match.
        assert_eq!(neckline_at(point(4, 100.0), point(8, 100.0), 12), 100.0);
    }

    #[test]
    fn flat_level_accepts_tight_cluster() {
        let highs = [99.8, 100.2, 100.1, 99.9, 100.0];
        let level = flat_level(&highs, 15, 0.005).unwrap();
        assert!((level - 100.0).abs() < 0.1);
    }

    #[test]
    fn flat_level_rejects_outliers_and_short_input() {
        let highs = [99.8, 100.2, 103.0, 99.9, 100.0];
        assert!(flat_level(&highs, 15, 0.005).is_none());
        assert!(flat_level(&[100.0, 100.0, 100.0], 15, 0.005).is_none());
    }

    #[test]
    fn tail_extremes() {
        let values = [5.0, 1.0, 9.0, 3.0, 4.0];
        assert_eq!(tail_min(&values, 3), Some(3.0));
        assert_eq!(tail_max(&values, 3), Some(9.0));
        assert_eq!(tail(&values, 10).len(), 5);
        assert_eq!(tail_min(&[], 3), None);
    }
}
