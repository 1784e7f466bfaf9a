//! Ascending (bullish) and descending (bearish) triangles
//!
//! One flat boundary and one converging trendline, squeezed together on
//! shrinking volume. The flat side is the mean of the recent highs (lows)
//! with every bar inside the flat-line tolerance; the converging side is a
//! least-squares slope over the recent lows (highs). Volume must compress
//! during the coil and expand hard on the trigger-timeframe break.

use crate::detectors::helpers::{flat_level, tail, tail_max, tail_min};
use crate::indicators::{regression_slope, rel_vol};
use crate::policy::Policy;
use crate::{Detector, PatternKind, PatternResult, Side, SnapshotColumns, Trend};

const MIN_STRUCTURE_BARS: usize = 10;
/// Bars considered for the flat boundary.
const FLAT_WINDOW: usize = 15;
/// Bars considered for the converging trendline.
const SLOPE_WINDOW: usize = 8;
/// Bars considered for the most recent higher low / lower high.
const LAST_EXTREME_WINDOW: usize = 5;

/// Bullish ascending triangle: flat resistance, rising support.
#[derive(Debug, Clone, Copy, Default)]
pub struct AscendingTriangleDetector;

impl Detector for AscendingTriangleDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::AscendingTriangle
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_ascending(cols, policy)
    }
}

/// Bearish descending triangle: flat support, falling resistance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescendingTriangleDetector;

impl Detector for DescendingTriangleDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::DescendingTriangle
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_descending(cols, policy)
    }
}

fn detect_ascending(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::AscendingTriangle;
    let s = &cols.structure;

    if s.highs.len() < MIN_STRUCTURE_BARS {
        return PatternResult::invalid(kind, "need at least 10 structure bars");
    }
    let Some(resistance) = flat_level(&s.highs, FLAT_WINDOW, policy.flat_line_tolerance) else {
        return PatternResult::invalid(kind, "no flat resistance across recent highs");
    };
    let slope = regression_slope(tail(&s.lows, SLOPE_WINDOW));
    if !slope.is_some_and(|m| m > 0.0) {
        return PatternResult::invalid(kind, "support trendline slope must be positive");
    }

    if let Some(rv) = rel_vol(s, policy.volume_avg_period) {
        if rv >= policy.compression_rel_vol_max {
            return PatternResult::invalid(
                kind,
                format!(
                    "relative volume {rv:.2} too high — compression requires under {}",
                    policy.compression_rel_vol_max
                ),
            );
        }
    }

    // At least 10 bars here, so the trailing extremes exist.
    let last_higher_low = tail_min(&s.lows, LAST_EXTREME_WINDOW).unwrap_or(resistance);
    let height = resistance - last_higher_low;

    let last_close = cols.trigger.last_close();
    let volume_ok = rel_vol(&cols.trigger, policy.volume_avg_period)
        .map_or(true, |rv| rv >= policy.triangle_breakout_rel_vol_min);
    let confirmed = last_close.is_some_and(|c| c > resistance) && volume_ok;

    PatternResult {
        valid: confirmed,
        reason: if confirmed {
            "ascending triangle breakout: trigger close above resistance with volume".to_string()
        } else {
            "awaiting trigger close above resistance with volume expansion".to_string()
        },
        pattern: kind,
        side: Some(Side::Ce),
        stop_loss: Some(last_higher_low),
        take_profit: Some(resistance + height),
        confirm_close: last_close,
    }
}

fn detect_descending(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::DescendingTriangle;
    let s = &cols.structure;

    if s.lows.len() < MIN_STRUCTURE_BARS {
        return PatternResult::invalid(kind, "need at least 10 structure bars");
    }
    let Some(support) = flat_level(&s.lows, FLAT_WINDOW, policy.flat_line_tolerance) else {
        return PatternResult::invalid(kind, "no flat support across recent lows");
    };
    let slope = regression_slope(tail(&s.highs, SLOPE_WINDOW));
    if !slope.is_some_and(|m| m < 0.0) {
        return PatternResult::invalid(kind, "resistance trendline slope must be negative");
    }

    if let Some(rv) = rel_vol(s, policy.volume_avg_period) {
        if rv >= policy.compression_rel_vol_max {
            return PatternResult::invalid(
                kind,
                format!(
                    "relative volume {rv:.2} too high — compression requires under {}",
                    policy.compression_rel_vol_max
                ),
            );
        }
    }

    let last_lower_high = tail_max(&s.highs, LAST_EXTREME_WINDOW).unwrap_or(support);
    let height = last_lower_high - support;

    let last_close = cols.trigger.last_close();
    let volume_ok = rel_vol(&cols.trigger, policy.volume_avg_period)
        .map_or(true, |rv| rv >= policy.triangle_breakout_rel_vol_min);
    let confirmed = last_close.is_some_and(|c| c < support) && volume_ok;

    PatternResult {
        valid: confirmed,
        reason: if confirmed {
            "descending triangle breakdown: trigger close below support with volume".to_string()
        } else {
            "awaiting trigger close below support with volume expansion".to_string()
        },
        pattern: kind,
        side: Some(Side::Pe),
        stop_loss: Some(last_lower_high),
        take_profit: Some(support - height),
        confirm_close: last_close,
    }
}
