//! Head and shoulders (bearish) and its inverse (bullish)
//!
//! Structure is read off the structure timeframe's swing extremes: the last
//! three swing highs (lows for the inverse) are taken as left shoulder, head,
//! right shoulder. The neckline connects the swing low between LS and head
//! with the one between head and RS, interpolated out to the right shoulder's
//! bar. Volume must fade into the right shoulder while the head carries the
//! expansion, and the move only triggers on a trigger-timeframe close through
//! the neckline with expanding volume.

use crate::detectors::helpers::{highest_between, lowest_between, neckline_at};
use crate::indicators::{rel_vol, rel_vol_at};
use crate::policy::Policy;
use crate::swing::{swing_highs_indexed, swing_lows_indexed};
use crate::{Detector, PatternKind, PatternResult, Side, SnapshotColumns, Trend};

/// Bearish head and shoulders on the structure timeframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadAndShouldersDetector;

impl Detector for HeadAndShouldersDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::HeadAndShoulders
    }

    fn detect(&self, cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
        detect_bearish(cols, trend, policy)
    }
}

/// Inverse head and shoulders: the bullish mirror on swing lows.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseHeadAndShouldersDetector;

impl Detector for InverseHeadAndShouldersDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::InverseHeadAndShoulders
    }

    fn detect(&self, cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
        detect_inverse(cols, trend, policy)
    }
}

fn detect_bearish(cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
    let kind = PatternKind::HeadAndShoulders;
    let s = &cols.structure;

    let highs = swing_highs_indexed(&s.highs, policy.swing_window);
    let lows = swing_lows_indexed(&s.lows, policy.swing_window);
    if highs.len() < 3 || lows.len() < 2 {
        return PatternResult::invalid(kind, "need at least 3 swing highs and 2 swing lows");
    }

    let ls = highs[highs.len() - 3];
    let head = highs[highs.len() - 2];
    let rs = highs[highs.len() - 1];
    if head.value <= ls.value {
        return PatternResult::invalid(kind, "head must be higher than the left shoulder");
    }
    if rs.value >= head.value {
        return PatternResult::invalid(kind, "right shoulder must be lower than the head");
    }

    // Highest swing low on each side of the head forms the neckline.
    let left_neck = highest_between(&lows, ls.index, head.index);
    let right_neck = highest_between(&lows, head.index, rs.index);
    let (Some(left_neck), Some(right_neck)) = (left_neck, right_neck) else {
        return PatternResult::invalid(
            kind,
            "neckline needs a swing low between each shoulder and the head",
        );
    };
    let neckline = neckline_at(left_neck, right_neck, rs.index);

    let symmetry = (ls.value - rs.value).abs() / head.value;
    if symmetry > policy.shoulder_symmetry_max {
        return PatternResult::invalid(
            kind,
            format!("shoulder symmetry {symmetry:.4} beyond tolerance"),
        );
    }

    let vol_ls = s.volumes[ls.index];
    let vol_head = s.volumes[head.index];
    let vol_rs = s.volumes[rs.index];
    if vol_ls <= vol_rs {
        return PatternResult::invalid(
            kind,
            "volume at the left shoulder must exceed the right shoulder",
        );
    }
    if vol_head < vol_ls {
        return PatternResult::invalid(
            kind,
            "volume at the head must be at least the left shoulder",
        );
    }
    if let Some(rv) = rel_vol_at(s, policy.volume_avg_period, head.index) {
        if rv < policy.head_rel_vol_min {
            return PatternResult::invalid(
                kind,
                format!("relative volume {rv:.2} at the head below {}", policy.head_rel_vol_min),
            );
        }
    }

    if trend != Trend::Bullish {
        return PatternResult::invalid(
            kind,
            "prior trend must be bullish for a bearish head and shoulders",
        );
    }

    let confirm = confirm_break(cols, neckline, policy, BreakSide::Below);
    let take_profit = neckline - (head.value - neckline);
    PatternResult {
        valid: confirm.confirmed,
        reason: if confirm.confirmed {
            "bearish head and shoulders confirmed".to_string()
        } else {
            confirm.reason
        },
        pattern: kind,
        side: Some(Side::Pe),
        stop_loss: Some(rs.value),
        take_profit: Some(take_profit),
        confirm_close: confirm.close,
    }
}

fn detect_inverse(cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult {
    let kind = PatternKind::InverseHeadAndShoulders;
    let s = &cols.structure;

    let highs = swing_highs_indexed(&s.highs, policy.swing_window);
    let lows = swing_lows_indexed(&s.lows, policy.swing_window);
    if lows.len() < 3 || highs.len() < 2 {
        return PatternResult::invalid(kind, "need at least 3 swing lows and 2 swing highs");
    }

    let ls = lows[lows.len() - 3];
    let head = lows[lows.len() - 2];
    let rs = lows[lows.len() - 1];
    if head.value >= ls.value {
        return PatternResult::invalid(kind, "head must be lower than the left shoulder");
    }
    if rs.value <= head.value {
        return PatternResult::invalid(kind, "right shoulder must be higher than the head");
    }

    // Lowest swing high on each side of the head forms the neckline.
    let left_neck = lowest_between(&highs, ls.index, head.index);
    let right_neck = lowest_between(&highs, head.index, rs.index);
    let (Some(left_neck), Some(right_neck)) = (left_neck, right_neck) else {
        return PatternResult::invalid(
            kind,
            "neckline needs a swing high between each shoulder and the head",
        );
    };
    let neckline = neckline_at(left_neck, right_neck, rs.index);

    let symmetry = (ls.value - rs.value).abs() / head.value.abs();
    if symmetry > policy.shoulder_symmetry_max {
        return PatternResult::invalid(
            kind,
            format!("shoulder symmetry {symmetry:.4} beyond tolerance"),
        );
    }

    let vol_ls = s.volumes[ls.index];
    let vol_head = s.volumes[head.index];
    let vol_rs = s.volumes[rs.index];
    if vol_ls <= vol_rs {
        return PatternResult::invalid(
            kind,
            "volume at the left shoulder must exceed the right shoulder",
        );
    }
    if vol_head < vol_ls {
        return PatternResult::invalid(
            kind,
            "volume at the head must be at least the left shoulder",
        );
    }
    if let Some(rv) = rel_vol_at(s, policy.volume_avg_period, head.index) {
        if rv < policy.head_rel_vol_min {
            return PatternResult::invalid(
                kind,
                format!("relative volume {rv:.2} at the head below {}", policy.head_rel_vol_min),
            );
        }
    }

    if trend != Trend::Bearish {
        return PatternResult::invalid(
            kind,
            "prior trend must be bearish for an inverse head and shoulders",
        );
    }

    let confirm = confirm_break(cols, neckline, policy, BreakSide::Above);
    let take_profit = neckline + (neckline - head.value);
    PatternResult {
        valid: confirm.confirmed,
        reason: if confirm.confirmed {
            "inverse head and shoulders confirmed".to_string()
        } else {
            confirm.reason
        },
        pattern: kind,
        side: Some(Side::Ce),
        stop_loss: Some(rs.value),
        take_profit: Some(take_profit),
        confirm_close: confirm.close,
    }
}

enum BreakSide {
    Below,
    Above,
}

struct Confirmation {
    confirmed: bool,
    reason: String,
    close: Option<f64>,
}

fn confirm_break(
    cols: &SnapshotColumns,
    neckline: f64,
    policy: &Policy,
    side: BreakSide,
) -> Confirmation {
    let trigger = &cols.trigger;
    let Some(last_close) = trigger.last_close() else {
        return Confirmation {
            confirmed: false,
            reason: "no trigger-timeframe close available".to_string(),
            close: None,
        };
    };
    if let Some(rv) = rel_vol(trigger, policy.volume_avg_period) {
        if rv < policy.neckline_rel_vol_min {
            return Confirmation {
                confirmed: false,
                reason: format!(
                    "neckline break without volume: trigger relative volume {rv:.2} under {}",
                    policy.neckline_rel_vol_min
                ),
                close: Some(last_close),
            };
        }
    }
    let (confirmed, awaiting) = match side {
        BreakSide::Below => (last_close < neckline, "awaiting trigger close below the neckline"),
        BreakSide::Above => (last_close > neckline, "awaiting trigger close above the neckline"),
    };
    Confirmation {
        confirmed,
        reason: if confirmed { "neckline break with volume".to_string() } else { awaiting.to_string() },
        close: Some(last_close),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotColumns;
    use crate::series::SeriesView;

    // Three swing highs at 100 / 110 / 102 with troughs at 93 and 94 between
    // them; the interpolated neckline at the right shoulder's bar is 94.5.
    fn structure_with_peaks() -> SeriesView {
        let highs = vec![
            90.0, 94.0, 97.0, 99.0, 100.0, 99.0, 96.0, 95.0, 99.0, 105.0, 110.0, 105.0, 99.0,
            96.0, 99.0, 101.0, 102.0, 99.0, 95.0,
        ];
        let lows: Vec<f64> = highs.iter().map(|h| h - 2.0).collect();
        let closes: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let mut volumes = vec![1000.0; highs.len()];
        volumes[10] = 1200.0; // head
        volumes[16] = 900.0; // right shoulder
        SeriesView { opens: closes.clone(), highs, lows, closes, volumes }
    }

    fn trigger_closing_at(close: f64) -> SeriesView {
        let closes = vec![96.0, 95.0, close];
        SeriesView {
            opens: closes.clone(),
            highs: closes.iter().map(|c| c + 0.5).collect(),
            lows: closes.iter().map(|c| c - 0.5).collect(),
            closes,
            volumes: vec![100.0; 3],
        }
    }

    fn cols(structure: SeriesView, trigger: SeriesView) -> SnapshotColumns {
        SnapshotColumns { structure, trigger, ..Default::default() }
    }

    #[test]
    fn bearish_pattern_confirms_below_neckline() {
        let cols = cols(structure_with_peaks(), trigger_closing_at(94.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bullish, &Policy::default());
        assert!(result.valid, "reason: {}", result.reason);
        assert_eq!(result.side, Some(Side::Pe));
        assert_eq!(result.stop_loss, Some(102.0));
        // Neckline 94.5, head 110: target = 94.5 - 15.5.
        assert!((result.take_profit.unwrap() - 79.0).abs() < 1e-9);
        assert_eq!(result.confirm_close, Some(94.0));
    }

    #[test]
    fn unbroken_neckline_keeps_levels_but_stays_invalid() {
        let cols = cols(structure_with_peaks(), trigger_closing_at(95.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bullish, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("awaiting"));
        assert_eq!(result.stop_loss, Some(102.0));
    }

    #[test]
    fn bearish_needs_bullish_prior_trend() {
        let cols = cols(structure_with_peaks(), trigger_closing_at(94.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bearish, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("prior trend"));
    }

    #[test]
    fn fading_head_volume_rejects() {
        let mut structure = structure_with_peaks();
        structure.volumes[10] = 900.0; // head below left shoulder
        let cols = cols(structure, trigger_closing_at(94.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bullish, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("head"));
    }

    #[test]
    fn rising_right_shoulder_volume_rejects() {
        let mut structure = structure_with_peaks();
        structure.volumes[16] = 1100.0;
        let cols = cols(structure, trigger_closing_at(94.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bullish, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("left shoulder"));
    }

    #[test]
    fn too_few_swings_invalid_without_panic() {
        let flat = SeriesView::default();
        let cols = cols(flat, trigger_closing_at(94.0));
        let result = HeadAndShouldersDetector.detect(&cols, Trend::Bullish, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("swing highs"));
    }

    #[test]
    fn inverse_pattern_confirms_above_neckline() {
        // Mirror of the bearish fixture around 200.
        let bearish = structure_with_peaks();
        let lows: Vec<f64> = bearish.highs.iter().map(|h| 200.0 - h).collect();
        let highs: Vec<f64> = lows.iter().map(|l| l + 2.0).collect();
        let closes: Vec<f64> = lows.iter().map(|l| l + 1.0).collect();
        let structure = SeriesView {
            opens: closes.clone(),
            highs,
            lows,
            closes,
            volumes: bearish.volumes.clone(),
        };
        let cols = cols(structure, trigger_closing_at(106.0));
        let result =
            InverseHeadAndShouldersDetector.detect(&cols, Trend::Bearish, &Policy::default());
        assert!(result.valid, "reason: {}", result.reason);
        assert_eq!(result.side, Some(Side::Ce));
        assert_eq!(result.stop_loss, Some(98.0));
        // Neckline 105.5, head 90: target = 105.5 + 15.5.
        assert!((result.take_profit.unwrap() - 121.0).abs() < 1e-9);
    }
}
