//! Market context gate
//!
//! Global preconditions evaluated once per pipeline run: higher-timeframe
//! trend, structure-timeframe volatility, and structure-timeframe volume.
//! The gate fails closed on missing data; the reason names the first failing
//! sub-check in `{volume, volatility}` priority order.

use serde::Serialize;

use crate::indicators::{atr, atr_tail_series, ema, rel_vol, vwap};
use crate::policy::Policy;
use crate::series::SeriesView;
use crate::Trend;

/// Immutable snapshot of the market regime for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct MarketContext {
    /// Overall gate: volatility and volume both passed.
    pub passed: bool,
    /// First failing sub-check, or the measured relative volume when passed.
    pub reason: String,
    /// Higher-timeframe trend label, reported even when the gate fails.
    pub trend: Trend,
    /// Trend additionally confirmed by volume and VWAP side.
    pub trend_confirmed: bool,
    pub volatility_ok: bool,
    pub volume_ok: bool,
    /// Structure-timeframe relative volume, when measurable.
    pub rel_vol: Option<f64>,
    /// Structure-timeframe VWAP, when measurable.
    pub vwap: Option<f64>,
}

impl MarketContext {
    /// Evaluate the gate from higher-timeframe (trend) and structure-timeframe
    /// (volatility + volume) columns.
    pub fn evaluate(higher: &SeriesView, structure: &SeriesView, policy: &Policy) -> Self {
        let trend = trend_label(higher, policy);
        let rel_vol = rel_vol(structure, policy.volume_avg_period);
        let vwap = vwap(structure);
        let volatility_ok = volatility_ok(structure, policy);
        let volume_ok = rel_vol.is_some_and(|rv| rv >= policy.rel_vol_master);
        let trend_confirmed = trend_confirmed(trend, structure, rel_vol, vwap, policy);

        let passed = volatility_ok && volume_ok;
        let reason = if !volume_ok {
            format!(
                "index volume below average: structure relative volume under {} — no entries",
                policy.rel_vol_master
            )
        } else if !volatility_ok {
            "volatility filter failed: ATR not above its trailing median".to_string()
        } else {
            format!("ok: structure relative volume {:.2}", rel_vol.unwrap_or(0.0))
        };

        MarketContext {
            passed,
            reason,
            trend,
            trend_confirmed,
            volatility_ok,
            volume_ok,
            rel_vol,
            vwap,
        }
    }
}

/// Higher-timeframe trend from fast vs. slow EMA of closes.
///
/// Fewer closes than the slow period, an undefined EMA, or exact equality all
/// report `Neutral`.
pub fn trend_label(higher: &SeriesView, policy: &Policy) -> Trend {
    if higher.closes.len() < policy.ema_slow {
        return Trend::Neutral;
    }
    let (fast, slow) = match (
        ema(&higher.closes, policy.ema_fast),
        ema(&higher.closes, policy.ema_slow),
    ) {
        (Some(f), Some(s)) => (f, s),
        _ => return Trend::Neutral,
    };
    if fast > slow {
        Trend::Bullish
    } else if fast < slow {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

fn volatility_ok(structure: &SeriesView, policy: &Policy) -> bool {
    if structure.highs.len() < policy.atr_period + policy.atr_lookback {
        return false;
    }
    let Some(atr_now) =
        atr(&structure.highs, &structure.lows, &structure.closes, policy.atr_period)
    else {
        return false;
    };
    let mut tail = atr_tail_series(
        &structure.highs,
        &structure.lows,
        &structure.closes,
        policy.atr_period,
        policy.atr_lookback,
    );
    if tail.len() < policy.atr_lookback {
        return false;
    }
    tail.sort_by(|a, b| a.total_cmp(b));
    let median = tail[policy.atr_lookback / 2];
    atr_now > median
}

fn trend_confirmed(
    trend: Trend,
    structure: &SeriesView,
    rel_vol: Option<f64>,
    vwap: Option<f64>,
    policy: &Policy,
) -> bool {
    let Some(rv) = rel_vol else { return false };
    if rv < policy.rel_vol_trend {
        return false;
    }
    let Some(vwap) = vwap else { return false };
    let Some(last_close) = structure.last_close() else { return false };
    match trend {
        Trend::Bullish => last_close > vwap,
        Trend::Bearish => last_close < vwap,
        Trend::Neutral => false,
    }
}
