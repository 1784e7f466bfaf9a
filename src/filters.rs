//! Signal vetoes
//!
//! Each filter is a pure veto: it can only reject a candidate signal, never
//! upgrade one. All verdicts carry a human-readable reason for the audit
//! trail.

use serde::Serialize;

use crate::indicators::rel_vol;
use crate::policy::Policy;
use crate::series::SeriesView;
use crate::{Side, Trend};

/// Outcome of a single filter check.
#[derive(Debug, Clone, Serialize)]
pub struct FilterVerdict {
    pub passed: bool,
    pub reason: String,
}

impl FilterVerdict {
    fn pass(reason: impl Into<String>) -> Self {
        FilterVerdict { passed: true, reason: reason.into() }
    }

    fn fail(reason: impl Into<String>) -> Self {
        FilterVerdict { passed: false, reason: reason.into() }
    }
}

// ============================================================
// MULTI-TIMEFRAME FILTER
// ============================================================

/// Higher-timeframe agreement veto: bullish entries require a bullish trend,
/// bearish entries a bearish one. Everything else fails closed.
#[derive(Debug, Clone, Copy)]
pub struct MtfFilter {
    trend: Trend,
}

impl MtfFilter {
    pub fn new(trend: Trend) -> Self {
        MtfFilter { trend }
    }

    pub fn allow_side(&self, side: Side) -> FilterVerdict {
        match side {
            Side::Ce if self.trend == Trend::Bullish => {
                FilterVerdict::pass("higher timeframe bullish — long entry allowed")
            }
            Side::Ce => FilterVerdict::fail("higher timeframe not bullish — skip long entry"),
            Side::Pe if self.trend == Trend::Bearish => {
                FilterVerdict::pass("higher timeframe bearish — short entry allowed")
            }
            Side::Pe => FilterVerdict::fail("higher timeframe not bearish — skip short entry"),
        }
    }
}

// ============================================================
// OPTIONS ELIGIBILITY FILTER
// ============================================================

/// Option-chain inputs, independent of price structure. Absent values never
/// block a trade.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OptionsContext {
    /// Implied-volatility percentile, 0–100.
    pub iv_percentile: Option<f64>,
    pub days_to_expiry: Option<u32>,
    /// Strikes away from at-the-money (signed).
    pub strike_offset: Option<i32>,
}

impl OptionsContext {
    /// Check every supplied value against its bound; violations are collected
    /// into one combined reason.
    pub fn evaluate(&self, policy: &Policy) -> FilterVerdict {
        let mut reasons = Vec::new();
        if let Some(iv) = self.iv_percentile {
            if iv >= policy.iv_percentile_max {
                reasons.push(format!(
                    "IV percentile {iv} at or above {}",
                    policy.iv_percentile_max
                ));
            }
        }
        if let Some(dte) = self.days_to_expiry {
            if dte < policy.min_days_to_expiry {
                reasons.push(format!(
                    "{dte} days to expiry below minimum {}",
                    policy.min_days_to_expiry
                ));
            }
        }
        if let Some(offset) = self.strike_offset {
            if offset.abs() > policy.strike_offset_max {
                reasons.push(format!(
                    "strike offset {offset} beyond ATM±{}",
                    policy.strike_offset_max
                ));
            }
        }
        if reasons.is_empty() {
            FilterVerdict::pass("options eligibility ok")
        } else {
            FilterVerdict::fail(reasons.join("; "))
        }
    }
}

// ============================================================
// FAKE BREAKOUT FILTER
// ============================================================

/// Verdict of the fake-breakout check. `fake == true` vetoes the signal.
#[derive(Debug, Clone, Serialize)]
pub struct BreakoutVerdict {
    pub fake: bool,
    pub reason: String,
}

/// A level break on thin trigger volume is a fake breakout, the majority
/// cause of retail losses. An unmeasurable relative volume does not mark the
/// break fake.
pub fn fake_breakout(trigger: &SeriesView, breaks_level: bool, policy: &Policy) -> BreakoutVerdict {
    if !breaks_level {
        return BreakoutVerdict { fake: false, reason: "no level break".to_string() };
    }
    match rel_vol(trigger, policy.volume_avg_period) {
        Some(rv) if rv < policy.breakout_rel_vol_min => BreakoutVerdict {
            fake: true,
            reason: format!(
                "fake breakout: trigger relative volume {rv:.2} under {} — do not enter",
                policy.breakout_rel_vol_min
            ),
        },
        _ => BreakoutVerdict { fake: false, reason: "breakout with volume".to_string() },
    }
}

// ============================================================
// VOLUME + VWAP CONFIRMATION
// ============================================================

/// Observability-only directional read: price side of VWAP, counted only when
/// volume participates. Never gates a signal.
#[derive(Debug, Clone, Serialize)]
pub struct VwapConfirmation {
    pub confirmed: bool,
    pub bias: Option<Trend>,
    pub reason: String,
}

/// VWAP without volume is irrelevant: the bias is only reported when trigger
/// relative volume reaches the trend threshold.
pub fn volume_vwap_confirmation(
    trigger: &SeriesView,
    vwap: Option<f64>,
    policy: &Policy,
) -> VwapConfirmation {
    let Some(vwap) = vwap else {
        return VwapConfirmation {
            confirmed: false,
            bias: None,
            reason: "no VWAP available".to_string(),
        };
    };
    let rv = rel_vol(trigger, policy.volume_avg_period);
    let Some(rv) = rv.filter(|rv| *rv >= policy.rel_vol_trend) else {
        return VwapConfirmation {
            confirmed: false,
            bias: None,
            reason: format!(
                "trigger relative volume under {} — VWAP side not meaningful",
                policy.rel_vol_trend
            ),
        };
    };
    let Some(last_close) = trigger.last_close() else {
        return VwapConfirmation {
            confirmed: false,
            bias: None,
            reason: "no trigger close".to_string(),
        };
    };
    if last_close > vwap {
        VwapConfirmation {
            confirmed: true,
            bias: Some(Trend::Bullish),
            reason: format!("price above VWAP, trigger relative volume {rv:.2}"),
        }
    } else if last_close < vwap {
        VwapConfirmation {
            confirmed: true,
            bias: Some(Trend::Bearish),
            reason: format!("price below VWAP, trigger relative volume {rv:.2}"),
        }
    } else {
        VwapConfirmation { confirmed: false, bias: None, reason: "price at VWAP".to_string() }
    }
}
