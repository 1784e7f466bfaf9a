//! Double top (bearish) and double bottom (bullish)
//!
//! Two near-equal structure-timeframe swing extremes with momentum and
//! volume fading into the second one: the institutional read is that the
//! retest failed to attract participation. The neckline is the raw extreme
//! between the two, and the trigger timeframe must close through it on a
//! breakout bar carrying at least `trigger_vol_mult` times its average
//! volume.

use crate::indicators::{avg_volume, rsi_at};
use crate::policy::Policy;
use crate::swing::{swing_highs_indexed, swing_lows_indexed};
use crate::{Detector, PatternKind, PatternResult, Side, SnapshotColumns, Trend};

/// Bearish double top on the structure timeframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleTopDetector;

impl Detector for DoubleTopDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::DoubleTop
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_double_top(cols, policy)
    }
}

/// Bullish double bottom on the structure timeframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleBottomDetector;

impl Detector for DoubleBottomDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::DoubleBottom
    }

    fn detect(&self, cols: &SnapshotColumns, _trend: Trend, policy: &Policy) -> PatternResult {
        detect_double_bottom(cols, policy)
    }
}

fn detect_double_top(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::DoubleTop;
    let s = &cols.structure;

    let highs = swing_highs_indexed(&s.highs, policy.swing_window);
    if highs.len() < 2 {
        return PatternResult::invalid(kind, "need at least 2 swing highs");
    }
    let top1 = highs[highs.len() - 2];
    let top2 = highs[highs.len() - 1];
    if (top1.value - top2.value).abs() / top1.value > policy.double_extreme_tolerance {
        return PatternResult::invalid(kind, "tops too far apart");
    }

    let between = &s.lows[top1.index..top2.index];
    let Some(neckline) = between.iter().copied().reduce(f64::min) else {
        return PatternResult::invalid(kind, "no swing low between the tops");
    };

    // Bearish divergence: momentum must be strictly weaker at the retest.
    let rsi1 = rsi_at(&s.closes, policy.rsi_period, top1.index);
    let rsi2 = rsi_at(&s.closes, policy.rsi_period, top2.index);
    if let (Some(rsi1), Some(rsi2)) = (rsi1, rsi2) {
        if rsi2 >= rsi1 {
            return PatternResult::invalid(
                kind,
                "RSI at the second top must be below the first (bearish divergence)",
            );
        }
    }

    if s.volumes[top2.index] >= s.volumes[top1.index] {
        return PatternResult::invalid(
            kind,
            "volume at the second top must be below the first",
        );
    }

    if !trigger_volume_ok(cols, policy) {
        return PatternResult::invalid(
            kind,
            format!(
                "breakdown bar volume must reach {}x its trailing average",
                policy.trigger_vol_mult
            ),
        );
    }

    let last_close = cols.trigger.last_close();
    let confirmed = last_close.is_some_and(|c| c < neckline);
    let take_profit = neckline - (top1.value - neckline);
    PatternResult {
        valid: confirmed,
        reason: if confirmed {
            "double top confirmed: trigger close below the neckline".to_string()
        } else {
            "awaiting trigger close below the low between the tops".to_string()
        },
        pattern: kind,
        side: Some(Side::Pe),
        stop_loss: Some(top2.value),
        take_profit: Some(take_profit),
        confirm_close: last_close,
    }
}

fn detect_double_bottom(cols: &SnapshotColumns, policy: &Policy) -> PatternResult {
    let kind = PatternKind::DoubleBottom;
    let s = &cols.structure;

    let lows = swing_lows_indexed(&s.lows, policy.swing_window);
    if lows.len() < 2 {
        return PatternResult::invalid(kind, "need at least 2 swing lows");
    }
    let bot1 = lows[lows.len() - 2];
    let bot2 = lows[lows.len() - 1];
    if (bot1.value - bot2.value).abs() / bot1.value > policy.double_extreme_tolerance {
        return PatternResult::invalid(kind, "bottoms too far apart");
    }

    let between = &s.highs[bot1.index..bot2.index];
    let Some(neckline) = between.iter().copied().reduce(f64::max) else {
        return PatternResult::invalid(kind, "no swing high between the bottoms");
    };

    // Bullish divergence: momentum must be strictly stronger at the retest.
    let rsi1 = rsi_at(&s.closes, policy.rsi_period, bot1.index);
    let rsi2 = rsi_at(&s.closes, policy.rsi_period, bot2.index);
    if let (Some(rsi1), Some(rsi2)) = (rsi1, rsi2) {
        if rsi2 <= rsi1 {
            return PatternResult::invalid(
                kind,
                "RSI at the second bottom must be above the first (bullish divergence)",
            );
        }
    }

    if s.volumes[bot2.index] >= s.volumes[bot1.index] {
        return PatternResult::invalid(
            kind,
            "volume at the second bottom must be below the first",
        );
    }

    if !trigger_volume_ok(cols, policy) {
        return PatternResult::invalid(
            kind,
            format!(
                "breakout bar volume must reach {}x its trailing average",
                policy.trigger_vol_mult
            ),
        );
    }

    let last_close = cols.trigger.last_close();
    let confirmed = last_close.is_some_and(|c| c > neckline);
    let take_profit = neckline + (neckline - bot1.value);
    PatternResult {
        valid: confirmed,
        reason: if confirmed {
            "double bottom confirmed: trigger close above the neckline".to_string()
        } else {
            "awaiting trigger close above the high between the bottoms".to_string()
        },
        pattern: kind,
        side: Some(Side::Ce),
        stop_loss: Some(bot2.value),
        take_profit: Some(take_profit),
        confirm_close: last_close,
    }
}

/// The breaking bar must carry volume; an unmeasurable average is permissive.
fn trigger_volume_ok(cols: &SnapshotColumns, policy: &Policy) -> bool {
    let volumes = &cols.trigger.volumes;
    let Some(avg) = avg_volume(volumes, policy.volume_avg_period) else {
        return true;
    };
    let Some(last) = volumes.last() else {
        return true;
    };
    *last >= policy.trigger_vol_mult * avg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotColumns;
    use crate::series::SeriesView;

    // Two swing highs at 100 (bar 4) and 99.5 (bar 10); the lowest low
    // between them is 93.
    fn twin_peaks() -> SeriesView {
        let highs = vec![
            90.0, 94.0, 97.0, 99.0, 100.0, 99.0, 96.0, 95.0, 97.0, 99.0, 99.5, 97.0, 94.0,
        ];
        let lows: Vec<f64> = highs.iter().map(|h| h - 2.0).collect();
        let closes: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let mut volumes = vec![1200.0; highs.len()];
        volumes[4] = 1500.0;
        volumes[10] = 1000.0;
        SeriesView { opens: closes.clone(), highs, lows, closes, volumes }
    }

    fn trigger_closing_at(close: f64) -> SeriesView {
        let closes = vec![93.5, close];
        SeriesView {
            opens: closes.clone(),
            highs: closes.iter().map(|c| c + 0.5).collect(),
            lows: closes.iter().map(|c| c - 0.5).collect(),
            closes,
            volumes: vec![100.0; 2],
        }
    }

    fn cols(structure: SeriesView, trigger: SeriesView) -> SnapshotColumns {
        SnapshotColumns { structure, trigger, ..Default::default() }
    }

    #[test]
    fn double_top_confirms_below_between_low() {
        let cols = cols(twin_peaks(), trigger_closing_at(92.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(result.valid, "reason: {}", result.reason);
        assert_eq!(result.side, Some(Side::Pe));
        assert_eq!(result.stop_loss, Some(99.5));
        // Neckline 93, height 7.
        assert!((result.take_profit.unwrap() - 86.0).abs() < 1e-9);
    }

    #[test]
    fn double_top_awaits_break() {
        let cols = cols(twin_peaks(), trigger_closing_at(93.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("awaiting"));
    }

    #[test]
    fn distant_tops_rejected() {
        let highs = vec![
            90.0, 94.0, 97.0, 99.0, 100.0, 99.0, 96.0, 95.0, 94.0, 96.0, 97.0, 94.0, 91.0,
        ];
        let lows: Vec<f64> = highs.iter().map(|h| h - 2.0).collect();
        let closes: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let n = highs.len();
        let structure =
            SeriesView { opens: closes.clone(), highs, lows, closes, volumes: vec![1000.0; n] };
        let cols = cols(structure, trigger_closing_at(92.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("too far apart"));
    }

    #[test]
    fn equal_retest_volume_rejected() {
        let mut structure = twin_peaks();
        structure.volumes[10] = 1500.0;
        let cols = cols(structure, trigger_closing_at(92.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("volume at the second top"));
    }

    #[test]
    fn missing_rsi_history_does_not_block() {
        // twin_peaks has 13 bars, too few for RSI(14): the divergence check
        // is skipped rather than failed.
        let cols = cols(twin_peaks(), trigger_closing_at(92.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(result.valid);
    }

    #[test]
    fn equal_rsi_at_retest_rejected() {
        // Straight climb to bar 18 (RSI 100), shallow dip, straight climb to
        // bar 37 (RSI 100 again): 100 >= 100 fails the strict divergence rule.
        let mut closes: Vec<f64> = (0..19).map(|i| 91.0 + 0.5 * i as f64).collect();
        closes.extend([99.0, 98.0, 97.0, 96.0]); // bars 19..=22
        closes.extend((1..=15).map(|i| 96.0 + 0.25 * i as f64)); // bars 23..=37
        closes.extend([99.0, 98.5]); // bars 38, 39
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.5).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let n = closes.len();
        let structure =
            SeriesView { opens: closes.clone(), highs, lows, closes, volumes: vec![1000.0; n] };
        let cols = cols(structure, trigger_closing_at(92.5));
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("RSI"), "reason: {}", result.reason);
    }

    #[test]
    fn thin_breakdown_volume_rejected() {
        let mut trigger = trigger_closing_at(92.5);
        // 20 bars of average volume, unremarkable last bar.
        trigger.volumes = vec![100.0; 20];
        trigger.closes = vec![93.5; 19]
            .into_iter()
            .chain(std::iter::once(92.5))
            .collect();
        trigger.opens = trigger.closes.clone();
        trigger.highs = trigger.closes.iter().map(|c| c + 0.5).collect();
        trigger.lows = trigger.closes.iter().map(|c| c - 0.5).collect();
        let cols = cols(twin_peaks(), trigger);
        let result = DoubleTopDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(!result.valid);
        assert!(result.reason.contains("breakdown bar volume"));
    }

    #[test]
    fn double_bottom_confirms_above_between_high() {
        let peaks = twin_peaks();
        let lows: Vec<f64> = peaks.highs.iter().map(|h| 200.0 - h).collect();
        let highs: Vec<f64> = lows.iter().map(|l| l + 2.0).collect();
        let closes: Vec<f64> = lows.iter().map(|l| l + 1.0).collect();
        let structure = SeriesView {
            opens: closes.clone(),
            highs,
            lows,
            closes,
            volumes: peaks.volumes.clone(),
        };
        let cols = cols(structure, trigger_closing_at(107.5));
        let result = DoubleBottomDetector.detect(&cols, Trend::Neutral, &Policy::default());
        assert!(result.valid, "reason: {}", result.reason);
        assert_eq!(result.side, Some(Side::Ce));
        assert_eq!(result.stop_loss, Some(100.5));
        // Neckline 107, depth 7.
        assert!((result.take_profit.unwrap() - 114.0).abs() < 1e-9);
    }
}
