//! Engulfing at a level
//!
//! A two-bar full-body engulfing on the trigger timeframe, anchored to a
//! known level: support, VWAP, or the 61.8% retracement for the bullish
//! variant, resistance for the bearish one. The engulfing bar is its own
//! trigger (there is no separate confirmation bar), so the volume and RSI
//! conditions all read the trigger series directly. An engulfing away from
//! any level, or without volume, is noise.

use crate::indicators::{rel_vol, rsi};
use crate::policy::Policy;
use crate::{Detector, PatternKind, PatternResult, Side, SnapshotColumns, Trend};

/// Bullish engulfing at support / VWAP / 61.8% retracement.
#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingDetector;

impl Detector for BullishEngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BullishEngulfing
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_bullish(cols, policy)
    }
}

/// Bearish engulfing at resistance.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearishEngulfingDetector;

impl Detector for BearishEngulfingDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BearishEngulfing
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_bearish(cols, policy)
    }
}

fn detect_bullish(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::BullishEngulfing;
    let t = &cols.trigger;
    let n = t.closes.len();
    if n < 2 {
        return PatternResult::invalid(kind, "need at least two trigger bars");
    }

    let (c1_open, c1_close) = (t.opens[n - 2], t.closes[n - 2]);
    let (c2_open, c2_close) = (t.opens[n - 1], t.closes[n - 1]);
    if !(c1_close < c1_open && c2_close > c2_open) {
        return PatternResult::invalid(kind, "first bar must be bearish and the second bullish");
    }
    if c2_open >= c1_close {
        return PatternResult::invalid(kind, "second bar must open below the first close");
    }
    if c2_close <= c1_open {
        return PatternResult::invalid(kind, "second bar must close above the first open");
    }

    let level = cols.levels.support.or(cols.levels.fib_618).or(cols.levels.vwap);
    if !at_level(c2_open, c2_close, level, policy) {
        return PatternResult::invalid(
            kind,
            "bullish engulfing only counts at support, VWAP, or the 61.8% retracement",
        );
    }

    if let Some(rv) = rel_vol(t, policy.volume_avg_period) {
        if rv < policy.engulf_rel_vol_min {
            return PatternResult::invalid(
                kind,
                format!(
                    "trigger relative volume {rv:.2} below {} — engulfing without volume is noise",
                    policy.engulf_rel_vol_min
                ),
            );
        }
    }

    if let Some(rsi) = rsi(&t.closes, policy.rsi_period) {
        if rsi >= policy.rsi_oversold {
            return PatternResult::invalid(
                kind,
                format!("RSI {rsi:.1} not oversold at support"),
            );
        }
    }

    PatternResult {
        valid: true,
        reason: "bullish engulfing at level".to_string(),
        pattern: kind,
        side: Some(Side::Ce),
        stop_loss: Some(t.lows[n - 1]),
        take_profit: cols.levels.resistance,
        confirm_close: Some(c2_close),
    }
}

fn detect_bearish(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::BearishEngulfing;
    let t = &cols.trigger;
    let n = t.closes.len();
    if n < 2 {
        return PatternResult::invalid(kind, "need at least two trigger bars");
    }

    let (c1_open, c1_close) = (t.opens[n - 2], t.closes[n - 2]);
    let (c2_open, c2_close) = (t.opens[n - 1], t.closes[n - 1]);
    if !(c1_close > c1_open && c2_close < c2_open) {
        return PatternResult::invalid(kind, "first bar must be bullish and the second bearish");
    }
    if c2_open <= c1_close {
        return PatternResult::invalid(kind, "second bar must open above the first close");
    }
    if c2_close >= c1_open {
        return PatternResult::invalid(kind, "second bar must close below the first open");
    }

    if !at_level(c2_open, c2_close, cols.levels.resistance, policy) {
        return PatternResult::invalid(kind, "bearish engulfing only counts at resistance");
    }

    if let Some(rv) = rel_vol(t, policy.volume_avg_period) {
        if rv < policy.engulf_rel_vol_min {
            return PatternResult::invalid(
                kind,
                format!(
                    "trigger relative volume {rv:.2} below {} — engulfing without volume is noise",
                    policy.engulf_rel_vol_min
                ),
            );
        }
    }

    if let Some(rsi) = rsi(&t.closes, policy.rsi_period) {
        if rsi <= policy.rsi_overbought {
            return PatternResult::invalid(
                kind,
                format!("RSI {rsi:.1} not overbought at resistance"),
            );
        }
    }

    PatternResult {
        valid: true,
        reason: "bearish engulfing at level".to_string(),
        pattern: kind,
        side: Some(Side::Pe),
        stop_loss: Some(t.highs[n - 1]),
        take_profit: cols.levels.support,
        confirm_close: Some(c2_close),
    }
}

/// The engulfing bar's body midpoint must sit within the level tolerance.
fn at_level(open: f64, close: f64, level: Option<f64>, policy: &Policy) -> bool {
    let Some(level) = level else { return false };
    if level == 0.0 {
        return false;
    }
    let midpoint = (open + close) / 2.0;
    ((midpoint - level) / level).abs() < policy.level_tolerance
}
