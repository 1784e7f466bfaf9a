//! # chartsig: chart pattern signals for index and perp instruments
//!
//! Multi-timeframe chart-pattern detection with market-regime and volume
//! gating. Feed it OHLCV candles for a higher (trend), structure, trigger,
//! and optionally a fast timeframe; it answers with zero or more bounded,
//! explainable signals — direction, stop-loss, take-profit, and the reason
//! trail that produced them.
//!
//! ## Quick start
//!
//! ```rust
//! use chartsig::prelude::*;
//!
//! // Candle series come from your market-data layer, oldest first.
//! let higher: Vec<Candle> = vec![];
//! let structure: Vec<Candle> = vec![];
//! let trigger: Vec<Candle> = vec![];
//!
//! let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
//! let snapshot = MarketSnapshot::new(&higher, &structure, &trigger);
//!
//! let report = engine.run(&snapshot);
//! // No data: the market-context gate fails closed, with a reason.
//! assert!(!report.context.passed);
//! assert!(report.signals.is_empty());
//! ```
//!
//! The engine never performs I/O and never panics on thin data: every
//! missing precondition becomes a `valid: false` result or a failed filter
//! verdict carrying a human-readable reason.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

pub mod context;
pub mod detectors;
pub mod filters;
pub mod indicators;
pub mod levels;
pub mod policy;
pub mod series;
pub mod swing;

use context::MarketContext;
use detectors::*;
use filters::{fake_breakout, volume_vwap_confirmation, FilterVerdict, MtfFilter, VwapConfirmation};
use policy::Policy;
use series::SeriesView;

pub use filters::OptionsContext;

pub mod prelude {
    pub use crate::{
        // Context and filters
        context::MarketContext,
        // Detectors
        detectors::*,
        filters::{FilterVerdict, MtfFilter, OptionsContext, VwapConfirmation},
        // Policy
        policy::Policy,
        // Parallel
        scan_parallel,
        // Series model
        series::SeriesView,
        swing::SwingPoint,
        // Engine
        BuiltinDetector,
        Candle,
        Detector,
        EngineBuilder,
        LevelContext,
        MarketSnapshot,
        Ohlcv,
        PatternKind,
        PatternResult,
        PipelineReport,
        Result,
        Side,
        Signal,
        SignalEngine,
        SignalError,
        SnapshotColumns,
        SymbolReport,
        Trend,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Configuration errors. Data conditions are never errors; they surface as
/// invalid results with reasons.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    #[error("invalid policy: {0}")]
    InvalidPolicy(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

// ============================================================
// CANDLE MODEL
// ============================================================

/// Core OHLCV access trait. Implement it for your bar type; series are
/// ordered oldest first.
pub trait Ohlcv {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Opaque ordering key; never interpreted by the engine.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Plain candle record for callers without their own bar type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// DIRECTIONS AND PATTERN TAGS
// ============================================================

/// Requested option side: `Ce` rides bullish moves, `Pe` bearish ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ce,
    Pe,
}

impl Side {
    pub fn direction_label(self) -> &'static str {
        match self {
            Side::Ce => "Bullish",
            Side::Pe => "Bearish",
        }
    }
}

/// Higher-timeframe trend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// The pattern families the engine knows, one tag per directional variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    BullFlag,
    BearFlag,
    BullishEngulfing,
    BearishEngulfing,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "Head & Shoulders",
            PatternKind::InverseHeadAndShoulders => "Inverse Head & Shoulders",
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::BullFlag => "Bull Flag",
            PatternKind::BearFlag => "Bear Flag",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
        }
    }
}

// ============================================================
// RESULTS AND SIGNALS
// ============================================================

/// Outcome of one detector invocation. The reason is mandatory even for
/// valid results, so the audit trail survives into the signal.
#[derive(Debug, Clone, Serialize)]
pub struct PatternResult {
    pub valid: bool,
    pub reason: String,
    pub pattern: PatternKind,
    pub side: Option<Side>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// The trigger-timeframe close that confirmed (or refuted) the pattern.
    pub confirm_close: Option<f64>,
}

impl PatternResult {
    /// Precondition failure: no side, no levels, just the reason.
    pub fn invalid(pattern: PatternKind, reason: impl Into<String>) -> Self {
        PatternResult {
            valid: false,
            reason: reason.into(),
            pattern,
            side: None,
            stop_loss: None,
            take_profit: None,
            confirm_close: None,
        }
    }
}

/// A filter-surviving detection, the externally visible output unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub pattern: PatternKind,
    pub side: Side,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub reason: String,
    pub confirm_close: Option<f64>,
}

impl Signal {
    /// One-line human rendering, e.g.
    /// `Pattern: Double Top Bearish SL=99.5 TP=86`.
    pub fn summary(&self) -> String {
        let mut line =
            format!("Pattern: {} {}", self.pattern.name(), self.side.direction_label());
        if let Some(sl) = self.stop_loss {
            line.push_str(&format!(" SL={sl}"));
        }
        if let Some(tp) = self.take_profit {
            line.push_str(&format!(" TP={tp}"));
        }
        line
    }
}

// ============================================================
// SNAPSHOT INPUT
// ============================================================

/// Price levels consumed only by the engulfing-at-level detector.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LevelContext {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub vwap: Option<f64>,
    /// 61.8% retracement, see [`levels::golden_retracement`].
    pub fib_618: Option<f64>,
}

/// Borrowed input bundle for one pipeline run.
///
/// In the reference intraday policy the roles map to 60m (`higher`), 15m
/// (`structure`), 5m (`trigger`), and 1m (`fast`) candles.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot<'a, T: Ohlcv> {
    /// Trend timeframe.
    pub higher: &'a [T],
    /// Pattern-structure timeframe.
    pub structure: &'a [T],
    /// Confirmation/trigger timeframe.
    pub trigger: &'a [T],
    /// Entry-volume timeframe, optional.
    pub fast: Option<&'a [T]>,
    pub levels: LevelContext,
    pub options: OptionsContext,
}

impl<'a, T: Ohlcv> MarketSnapshot<'a, T> {
    pub fn new(higher: &'a [T], structure: &'a [T], trigger: &'a [T]) -> Self {
        MarketSnapshot {
            higher,
            structure,
            trigger,
            fast: None,
            levels: LevelContext::default(),
            options: OptionsContext::default(),
        }
    }

    pub fn with_fast(mut self, fast: &'a [T]) -> Self {
        self.fast = Some(fast);
        self
    }

    pub fn with_levels(mut self, levels: LevelContext) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_options(mut self, options: OptionsContext) -> Self {
        self.options = options;
        self
    }
}

/// Extracted column form of a snapshot: what the detectors actually consume.
/// Built once per run and shared.
#[derive(Debug, Clone, Default)]
pub struct SnapshotColumns {
    pub higher: SeriesView,
    pub structure: SeriesView,
    pub trigger: SeriesView,
    /// Empty view when the fast timeframe was not supplied.
    pub fast: SeriesView,
    pub levels: LevelContext,
    pub options: OptionsContext,
}

impl SnapshotColumns {
    pub fn from_snapshot<T: Ohlcv>(snapshot: &MarketSnapshot<'_, T>) -> Self {
        SnapshotColumns {
            higher: SeriesView::from_bars(snapshot.higher),
            structure: SeriesView::from_bars(snapshot.structure),
            trigger: SeriesView::from_bars(snapshot.trigger),
            fast: snapshot.fast.map(SeriesView::from_bars).unwrap_or_default(),
            levels: snapshot.levels,
            options: snapshot.options,
        }
    }
}

// ============================================================
// DETECTOR CAPABILITY
// ============================================================

/// One pattern detector: a stateless pure function of the snapshot columns,
/// the higher-timeframe trend, and the policy.
pub trait Detector: Send + Sync {
    fn kind(&self) -> PatternKind;
    fn detect(&self, cols: &SnapshotColumns, trend: Trend, policy: &Policy) -> PatternResult;
}

/// Generate the `BuiltinDetector` enum without boilerplate.
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// The enumerable detector set: enum dispatch, no vtable.
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn kind(&self) -> PatternKind {
                match self {
                    $(Self::$variant(d) => Detector::kind(d)),*
                }
            }

            #[inline]
            pub fn detect(
                &self,
                cols: &SnapshotColumns,
                trend: Trend,
                policy: &Policy,
            ) -> PatternResult {
                match self {
                    $(Self::$variant(d) => Detector::detect(d, cols, trend, policy)),*
                }
            }

            /// Every builtin detector, in pipeline evaluation order.
            pub fn all() -> Vec<BuiltinDetector> {
                vec![$(Self::$variant(<$detector>::default())),*]
            }
        }
    };
}

define_builtin_detectors! {
    HeadAndShoulders(HeadAndShouldersDetector),
    InverseHeadAndShoulders(InverseHeadAndShouldersDetector),
    DoubleTop(DoubleTopDetector),
    DoubleBottom(DoubleBottomDetector),
    AscendingTriangle(AscendingTriangleDetector),
    DescendingTriangle(DescendingTriangleDetector),
    BullFlag(BullFlagDetector),
    BearFlag(BearFlagDetector),
    BullishEngulfing(BullishEngulfingDetector),
    BearishEngulfing(BearishEngulfingDetector),
}

// ============================================================
// PIPELINE REPORT
// ============================================================

/// Everything one pipeline run produced: the surviving signals plus the
/// context/filter diagnostics for observability.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub context: MarketContext,
    /// `None` when the context gate short-circuited the run.
    pub options: Option<FilterVerdict>,
    /// `None` when the context gate short-circuited the run.
    pub volume_vwap: Option<VwapConfirmation>,
    pub signals: Vec<Signal>,
}

// ============================================================
// SIGNAL ENGINE
// ============================================================

/// The orchestrating pipeline: market-context gate, then every detector,
/// then the MTF / fake-breakout / options filters per detection.
pub struct SignalEngine {
    detectors: Vec<BuiltinDetector>,
    policy: Policy,
}

impl SignalEngine {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Full pipeline run. Authoritative for trading decisions.
    pub fn run<T: Ohlcv>(&self, snapshot: &MarketSnapshot<'_, T>) -> PipelineReport {
        self.run_columns(&SnapshotColumns::from_snapshot(snapshot))
    }

    /// Full pipeline run on pre-extracted columns.
    pub fn run_columns(&self, cols: &SnapshotColumns) -> PipelineReport {
        let context = MarketContext::evaluate(&cols.higher, &cols.structure, &self.policy);
        if !context.passed {
            debug!("context gate failed: {}", context.reason);
            return PipelineReport {
                context,
                options: None,
                volume_vwap: None,
                signals: Vec::new(),
            };
        }
        debug!("context gate passed: trend {:?}, {}", context.trend, context.reason);

        let mtf = MtfFilter::new(context.trend);
        let options = cols.options.evaluate(&self.policy);
        let volume_vwap = volume_vwap_confirmation(&cols.trigger, context.vwap, &self.policy);

        let mut signals = Vec::new();
        for detector in &self.detectors {
            let result = detector.detect(cols, context.trend, &self.policy);
            if !result.valid {
                trace!("{:?}: {}", result.pattern, result.reason);
                continue;
            }
            if !options.passed {
                debug!("{:?} vetoed by options filter: {}", result.pattern, options.reason);
                continue;
            }
            let Some(side) = result.side else {
                continue;
            };
            let mtf_verdict = mtf.allow_side(side);
            if !mtf_verdict.passed {
                debug!("{:?} vetoed: {}", result.pattern, mtf_verdict.reason);
                continue;
            }
            // Every valid detection here rode a level break or level touch.
            let breakout = fake_breakout(&cols.trigger, true, &self.policy);
            if breakout.fake {
                debug!("{:?} vetoed: {}", result.pattern, breakout.reason);
                continue;
            }
            signals.push(Signal {
                pattern: result.pattern,
                side,
                stop_loss: result.stop_loss,
                take_profit: result.take_profit,
                reason: result.reason,
                confirm_close: result.confirm_close,
            });
        }

        PipelineReport { context, options: Some(options), volume_vwap: Some(volume_vwap), signals }
    }

    /// Lightweight adapter: the first valid detection, unfiltered. Meant for
    /// one-line summaries, not for trade execution.
    pub fn first_match<T: Ohlcv>(
        &self,
        snapshot: &MarketSnapshot<'_, T>,
    ) -> Option<PatternResult> {
        self.first_match_columns(&SnapshotColumns::from_snapshot(snapshot))
    }

    /// First-match adapter on pre-extracted columns.
    pub fn first_match_columns(&self, cols: &SnapshotColumns) -> Option<PatternResult> {
        let trend = context::trend_label(&cols.higher, &self.policy);
        self.detectors
            .iter()
            .map(|d| d.detect(cols, trend, &self.policy))
            .find(|result| result.valid)
    }

    /// One-line pattern summary for prompt assembly, e.g.
    /// `Pattern: Bullish Engulfing Bullish SL=99.7 TP=110` or `Pattern: None`.
    pub fn summary_line<T: Ohlcv>(&self, snapshot: &MarketSnapshot<'_, T>) -> String {
        let cols = SnapshotColumns::from_snapshot(snapshot);
        if cols.structure.len() < self.policy.summary_min_bars
            || cols.trigger.len() < self.policy.summary_min_bars
        {
            return "Pattern: None".to_string();
        }
        match self.first_match_columns(&cols) {
            Some(result) => {
                let mut line = format!("Pattern: {}", result.pattern.name());
                if let Some(side) = result.side {
                    line.push_str(&format!(" {}", side.direction_label()));
                }
                if let Some(sl) = result.stop_loss {
                    line.push_str(&format!(" SL={sl}"));
                }
                if let Some(tp) = result.take_profit {
                    line.push_str(&format!(" TP={tp}"));
                }
                line
            }
            None => "Pattern: None".to_string(),
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`SignalEngine`]. Policy validation happens at `build`.
pub struct EngineBuilder {
    detectors: Vec<BuiltinDetector>,
    policy: Policy,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        EngineBuilder { detectors: Vec::new(), policy: Policy::default() }
    }

    /// Register every builtin pattern family.
    pub fn with_all_defaults(mut self) -> Self {
        self.detectors.extend(BuiltinDetector::all());
        self
    }

    /// Register a single detector.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Replace the threshold policy.
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<SignalEngine> {
        self.policy.validate()?;
        Ok(SignalEngine { detectors: self.detectors, policy: self.policy })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// One symbol's pipeline report.
#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: String,
    pub report: PipelineReport,
}

/// Run the engine over many instruments in parallel. Detector evaluation is
/// deterministic, so each report is identical to a sequential run; only the
/// fan-out is parallel. Reports come back in input order.
pub fn scan_parallel<'a, T, I>(engine: &SignalEngine, instruments: I) -> Vec<SymbolReport>
where
    T: Ohlcv + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, MarketSnapshot<'a, T>)>,
    I::Iter: IndexedParallelIterator,
{
    let mut reports: Vec<(usize, SymbolReport)> = instruments
        .into_par_iter()
        .enumerate()
        .map(|(index, (symbol, snapshot))| {
            let report = engine.run(&snapshot);
            (index, SymbolReport { symbol: symbol.to_string(), report })
        })
        .collect();
    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    #[test]
    fn builder_registers_all_families() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        assert_eq!(engine.detectors.len(), 10);
    }

    #[test]
    fn builder_rejects_invalid_policy() {
        let policy = Policy { atr_period: 0, ..Policy::default() };
        let result = EngineBuilder::new().with_all_defaults().policy(policy).build();
        assert!(result.is_err());
    }

    #[test]
    fn empty_snapshot_short_circuits() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let empty: Vec<Candle> = Vec::new();
        let snapshot = MarketSnapshot::new(&empty, &empty, &empty);
        let report = engine.run(&snapshot);
        assert!(!report.context.passed);
        assert!(report.signals.is_empty());
        assert!(report.options.is_none());
        assert!(!report.context.reason.is_empty());
    }

    #[test]
    fn detectors_are_idempotent() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Candle> = (0..40).map(|i| candle(100.0 + i as f64, 100.0)).collect();
        let snapshot = MarketSnapshot::new(&bars, &bars, &bars);
        let cols = SnapshotColumns::from_snapshot(&snapshot);
        for detector in &engine.detectors {
            let first = detector.detect(&cols, Trend::Neutral, engine.policy());
            let second = detector.detect(&cols, Trend::Neutral, engine.policy());
            assert_eq!(first.valid, second.valid);
            assert_eq!(first.reason, second.reason);
            assert_eq!(first.stop_loss, second.stop_loss);
            assert_eq!(first.take_profit, second.take_profit);
        }
    }

    #[test]
    fn kinds_are_distinct_and_named() {
        let kinds: Vec<PatternKind> = BuiltinDetector::all().iter().map(|d| d.kind()).collect();
        assert_eq!(kinds.len(), 10);
        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
            assert!(!a.name().is_empty());
        }
    }

    #[test]
    fn summary_line_requires_minimum_bars() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Candle> = (0..3).map(|i| candle(100.0 + i as f64, 100.0)).collect();
        let snapshot = MarketSnapshot::new(&bars, &bars, &bars);
        assert_eq!(engine.summary_line(&snapshot), "Pattern: None");
    }

    #[test]
    fn signal_summary_renders_levels() {
        let signal = Signal {
            pattern: PatternKind::DoubleTop,
            side: Side::Pe,
            stop_loss: Some(99.5),
            take_profit: Some(86.0),
            reason: "test".to_string(),
            confirm_close: Some(92.5),
        };
        assert_eq!(signal.summary(), "Pattern: Double Top Bearish SL=99.5 TP=86");
    }

    #[test]
    fn signal_serde_round_trip() {
        let signal = Signal {
            pattern: PatternKind::BullFlag,
            side: Side::Ce,
            stop_loss: Some(113.8),
            take_profit: Some(129.0),
            reason: "bull flag breakout".to_string(),
            confirm_close: Some(115.5),
        };
        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("\"bull_flag\""));
        assert!(json.contains("\"ce\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pattern, PatternKind::BullFlag);
        assert_eq!(back.side, Side::Ce);
    }

    #[test]
    fn candle_implements_ohlcv() {
        let c = candle(100.0, 50.0);
        assert_eq!(Ohlcv::close(&c), 100.0);
        assert_eq!(Ohlcv::timestamp(&c), Some(0));
    }
}
