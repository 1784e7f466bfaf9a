//! Threshold policy for the detection pipeline
//!
//! Every tolerance, period, and volume multiplier used by the context gate,
//! the detectors, and the filters lives in one immutable [`Policy`] value
//! passed to the engine at construction. Tests override individual fields;
//! production callers use [`Policy::default`], which carries the reference
//! intraday configuration (60m trend / 15m structure / 5m trigger / 1m entry).

use serde::{Deserialize, Serialize};

use crate::{Result, SignalError};

/// Immutable threshold configuration for one engine instance.
///
/// All ratios are plain fractions (`0.03` = 3%), all relative-volume bounds
/// are multiples of the trailing 20-bar average volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    // --- series / indicator periods ---
    /// Bars on each side of a swing point (closed window).
    pub swing_window: usize,
    /// Trailing window for average volume and relative volume.
    pub volume_avg_period: usize,
    /// Fast EMA period for the higher-timeframe trend label.
    pub ema_fast: usize,
    /// Slow EMA period for the higher-timeframe trend label.
    pub ema_slow: usize,
    /// ATR period for the volatility gate and flag impulse sizing.
    pub atr_period: usize,
    /// Trailing ATR values the volatility gate takes its median over.
    pub atr_lookback: usize,
    /// RSI period for divergence and engulfing confirmation.
    pub rsi_period: usize,

    // --- market context gate ---
    /// Master gate: structure relative volume must reach this.
    pub rel_vol_master: f64,
    /// Stricter bound that, with VWAP agreement, marks the trend confirmed.
    pub rel_vol_trend: f64,

    // --- head and shoulders ---
    /// Max |LS - RS| / Head.
    pub shoulder_symmetry_max: f64,
    /// Relative volume required at the head bar.
    pub head_rel_vol_min: f64,
    /// Trigger relative volume required for the neckline break.
    pub neckline_rel_vol_min: f64,

    // --- double top / bottom ---
    /// Max distance between the two extremes, relative to the first.
    pub double_extreme_tolerance: f64,
    /// Breakdown/breakout bar volume vs. its 20-bar average.
    pub trigger_vol_mult: f64,

    // --- triangles ---
    /// Max deviation of recent highs/lows from their mean for a flat line.
    pub flat_line_tolerance: f64,
    /// Structure relative volume must stay below this during compression.
    pub compression_rel_vol_max: f64,
    /// Trigger relative volume required on the triangle breakout.
    pub triangle_breakout_rel_vol_min: f64,

    // --- flag / pennant ---
    /// Impulse leg must move at least this many ATRs.
    pub impulse_atr_mult: f64,
    /// Structure relative volume required during the impulse.
    pub impulse_rel_vol_min: f64,
    /// Flag volume must stay below this fraction of impulse volume.
    pub flag_volume_max_ratio: f64,
    /// Fast-timeframe relative volume required at breakout entry.
    pub entry_rel_vol_min: f64,
    /// Structure bars forming the impulse leg.
    pub impulse_bars: usize,
    /// Max trigger bars forming the flag.
    pub max_flag_bars: usize,

    // --- engulfing at level ---
    /// Trigger relative volume required for the engulfing bar.
    pub engulf_rel_vol_min: f64,
    /// RSI must be below this for a bullish engulfing at support.
    pub rsi_oversold: f64,
    /// RSI must be above this for a bearish engulfing at resistance.
    pub rsi_overbought: f64,
    /// Max distance of the engulfing midpoint from the level.
    pub level_tolerance: f64,

    // --- filters ---
    /// Below this trigger relative volume a level break is fake.
    pub breakout_rel_vol_min: f64,
    /// IV percentile at or above this blocks options entry.
    pub iv_percentile_max: f64,
    /// Minimum days to expiry.
    pub min_days_to_expiry: u32,
    /// Max strikes away from at-the-money.
    pub strike_offset_max: i32,

    // --- misc ---
    /// Minimum structure/trigger bars before the summary adapter reports.
    pub summary_min_bars: usize,
    /// Proximity to a fibonacci retracement, relative to the swing range.
    pub fib_level_tolerance: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            swing_window: 2,
            volume_avg_period: 20,
            ema_fast: 50,
            ema_slow: 200,
            atr_period: 14,
            atr_lookback: 20,
            rsi_period: 14,
            rel_vol_master: 1.1,
            rel_vol_trend: 1.2,
            shoulder_symmetry_max: 0.03,
            head_rel_vol_min: 1.3,
            neckline_rel_vol_min: 1.5,
            double_extreme_tolerance: 0.02,
            trigger_vol_mult: 1.5,
            flat_line_tolerance: 0.005,
            compression_rel_vol_max: 1.0,
            triangle_breakout_rel_vol_min: 2.0,
            impulse_atr_mult: 2.0,
            impulse_rel_vol_min: 1.8,
            flag_volume_max_ratio: 0.6,
            entry_rel_vol_min: 2.0,
            impulse_bars: 15,
            max_flag_bars: 10,
            engulf_rel_vol_min: 1.5,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            level_tolerance: 0.01,
            breakout_rel_vol_min: 1.0,
            iv_percentile_max: 70.0,
            min_days_to_expiry: 2,
            strike_offset_max: 1,
            summary_min_bars: 5,
            fib_level_tolerance: 0.005,
        }
    }
}

impl Policy {
    /// Validate the configuration. Called by `EngineBuilder::build`.
    pub fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("swing_window", self.swing_window),
            ("volume_avg_period", self.volume_avg_period),
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("atr_period", self.atr_period),
            ("atr_lookback", self.atr_lookback),
            ("rsi_period", self.rsi_period),
            ("impulse_bars", self.impulse_bars),
            ("max_flag_bars", self.max_flag_bars),
        ] {
            if period == 0 {
                return Err(SignalError::InvalidPolicy(name));
            }
        }
        if self.ema_fast >= self.ema_slow {
            return Err(SignalError::InvalidPolicy("ema_fast must be below ema_slow"));
        }
        for (name, value) in [
            ("rel_vol_master", self.rel_vol_master),
            ("rel_vol_trend", self.rel_vol_trend),
            ("head_rel_vol_min", self.head_rel_vol_min),
            ("neckline_rel_vol_min", self.neckline_rel_vol_min),
            ("trigger_vol_mult", self.trigger_vol_mult),
            ("compression_rel_vol_max", self.compression_rel_vol_max),
            ("triangle_breakout_rel_vol_min", self.triangle_breakout_rel_vol_min),
            ("impulse_atr_mult", self.impulse_atr_mult),
            ("impulse_rel_vol_min", self.impulse_rel_vol_min),
            ("flag_volume_max_ratio", self.flag_volume_max_ratio),
            ("entry_rel_vol_min", self.entry_rel_vol_min),
            ("engulf_rel_vol_min", self.engulf_rel_vol_min),
            ("breakout_rel_vol_min", self.breakout_rel_vol_min),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SignalError::InvalidPolicy(name));
            }
        }
        for (name, value) in [
            ("shoulder_symmetry_max", self.shoulder_symmetry_max),
            ("double_extreme_tolerance", self.double_extreme_tolerance),
            ("flat_line_tolerance", self.flat_line_tolerance),
            ("level_tolerance", self.level_tolerance),
            ("fib_level_tolerance", self.fib_level_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SignalError::InvalidPolicy(name));
            }
        }
        for (name, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("rsi_overbought", self.rsi_overbought),
            ("iv_percentile_max", self.iv_percentile_max),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(SignalError::OutOfRange { field: name, value, min: 0.0, max: 100.0 });
            }
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(SignalError::InvalidPolicy("rsi_oversold must be below rsi_overbought"));
        }
        if self.strike_offset_max < 0 {
            return Err(SignalError::InvalidPolicy("strike_offset_max must be non-negative"));
        }
        Ok(())
    }
}
