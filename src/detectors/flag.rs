//! Bull and bear flags / pennants
//!
//! An impulse leg on the structure timeframe (at least `impulse_atr_mult`
//! ATRs over `impulse_bars` bars, on expanded volume) followed by a short,
//! quiet consolidation on the trigger timeframe. The flag is the trailing
//! window of trigger bars before the latest one; the latest trigger close
//! breaking out of that window continues the impulse, and the entry wants
//! fast-timeframe volume expansion behind it.

use crate::detectors::helpers::{tail, tail_max, tail_min};
use crate::indicators::{atr, rel_vol};
use crate::policy::Policy;
use crate::series::SeriesView;
use crate::{Detector, PatternKind, PatternResult, Side, SnapshotColumns, Trend};

const MIN_TRIGGER_BARS: usize = 3;

/// Bullish flag: up impulse, quiet pullback, breakout above the flag high.
#[derive(Debug, Clone, Copy, Default)]
pub struct BullFlagDetector;

impl Detector for BullFlagDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BullFlag
    }

    fn detect(&self, cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
        detect_flag(cols, trend, policy, FlagDirection::Bull)
    }
}

/// Bearish flag: down impulse, quiet bounce, breakdown below the flag low.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearFlagDetector;

impl Detector for BearFlagDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::BearFlag
    }

    fn detect(&self, cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
        detect_flag(cols, trend, policy, FlagDirection::Bear)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FlagDirection {
    Bull,
    Bear,
}

fn detect_flag(
    cols: &SnapshotColumns,
    trend: Trend,
    policy: &Policy,
    direction: FlagDirection,
) -> PatternResult {
    let kind = match direction {
        FlagDirection::Bull => PatternKind::BullFlag,
        FlagDirection::Bear => PatternKind::BearFlag,
    };
    let s = &cols.structure;

    if s.closes.len() < policy.impulse_bars {
        return PatternResult::invalid(
            kind,
            format!("need at least {} structure bars for the impulse leg", policy.impulse_bars),
        );
    }
    let Some(atr) = atr(&s.highs, &s.lows, &s.closes, policy.atr_period) else {
        return PatternResult::invalid(kind, "volatility measure unavailable");
    };

    let impulse_start = s.closes[s.closes.len() - policy.impulse_bars];
    let impulse_end = s.closes[s.closes.len() - 1];
    let price_move = (impulse_end - impulse_start).abs();
    if price_move < policy.impulse_atr_mult * atr {
        return PatternResult::invalid(
            kind,
            format!("impulse leg smaller than {}x ATR", policy.impulse_atr_mult),
        );
    }

    if let Some(rv) = rel_vol(s, policy.volume_avg_period) {
        if rv < policy.impulse_rel_vol_min {
            return PatternResult::invalid(
                kind,
                format!(
                    "impulse relative volume {rv:.2} below {}",
                    policy.impulse_rel_vol_min
                ),
            );
        }
    }

    let trigger = &cols.trigger;
    if trigger.closes.len() < MIN_TRIGGER_BARS {
        return PatternResult::invalid(kind, "need at least 3 trigger bars");
    }

    // The flag is the consolidation window before the latest trigger bar.
    let flag_end = trigger.closes.len() - 1;
    let flag_highs = tail(&trigger.highs[..flag_end], policy.max_flag_bars);
    let flag_lows = tail(&trigger.lows[..flag_end], policy.max_flag_bars);
    let flag_volumes = tail(&trigger.volumes[..flag_end], policy.max_flag_bars);

    let impulse_vol: f64 = tail(&s.volumes, policy.impulse_bars).iter().sum();
    let flag_vol: f64 = flag_volumes.iter().sum();
    if impulse_vol > 0.0 && flag_vol > policy.flag_volume_max_ratio * impulse_vol {
        return PatternResult::invalid(
            kind,
            format!(
                "consolidation volume above {} of impulse volume",
                policy.flag_volume_max_ratio
            ),
        );
    }

    let flag_high = tail_max(flag_highs, policy.max_flag_bars).unwrap_or(impulse_end);
    let flag_low = tail_min(flag_lows, policy.max_flag_bars).unwrap_or(impulse_end);
    let last_close = trigger.closes[flag_end];

    match direction {
        FlagDirection::Bull => {
            if impulse_end <= impulse_start {
                return PatternResult::invalid(kind, "impulse must be bullish for a bull flag");
            }
            if trend != Trend::Bullish {
                return PatternResult::invalid(
                    kind,
                    "higher-timeframe trend must be bullish for a bull flag",
                );
            }
        }
        FlagDirection::Bear => {
            if impulse_end >= impulse_start {
                return PatternResult::invalid(kind, "impulse must be bearish for a bear flag");
            }
            if trend != Trend::Bearish {
                return PatternResult::invalid(
                    kind,
                    "higher-timeframe trend must be bearish for a bear flag",
                );
            }
        }
    }

    let breakout = match direction {
        FlagDirection::Bull => last_close > flag_high,
        FlagDirection::Bear => last_close < flag_low,
    };
    if breakout {
        if let Some(entry_rv) = entry_rel_vol(&cols.fast, policy) {
            if entry_rv < policy.entry_rel_vol_min {
                return PatternResult::invalid(
                    kind,
                    format!(
                        "entry volume on the fast timeframe {entry_rv:.2} below {}",
                        policy.entry_rel_vol_min
                    ),
                );
            }
        }
    }

    let (stop_loss, take_profit, reason_ok, reason_wait) = match direction {
        FlagDirection::Bull => (
            flag_low,
            impulse_end + price_move,
            "bull flag breakout: trigger close above the flag high",
            "awaiting trigger close above the flag high",
        ),
        FlagDirection::Bear => (
            flag_high,
            impulse_end - price_move,
            "bear flag breakdown: trigger close below the flag low",
            "awaiting trigger close below the flag low",
        ),
    };

    PatternResult {
        valid: breakout,
        reason: if breakout { reason_ok.to_string() } else { reason_wait.to_string() },
        pattern: kind,
        side: Some(if direction == FlagDirection::Bull { Side::Ce } else { Side::Pe }),
        stop_loss: Some(stop_loss),
        take_profit: Some(take_profit),
        confirm_close: Some(last_close),
    }
}

fn entry_rel_vol(fast: &SeriesView, policy: &Policy) -> Option<f64> {
    if fast.is_empty() {
        return None;
    }
    rel_vol(fast, policy.volume_avg_period)
}
