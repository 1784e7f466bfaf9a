//! Chart pattern detectors
//!
//! Five pattern families, each in bullish and bearish variants:
//!
//! - **Head & Shoulders**: reversal off three swing extremes with a neckline
//! - **Double top / bottom**: twin extremes with RSI and volume divergence
//! - **Triangles**: flat line plus converging trendline, volume compression
//! - **Flag / pennant**: impulse leg, quiet consolidation, breakout
//! - **Engulfing at level**: two-bar reversal anchored to a known level
//!
//! Every detector is a stateless pure function of the snapshot columns, the
//! higher-timeframe trend, and the policy. Data insufficiency is never an
//! error: it is a `valid: false` result whose reason names the first failing
//! precondition.

pub mod helpers;

pub mod double;
pub mod engulfing;
pub mod flag;
pub mod head_shoulders;
pub mod triangle;

pub use double::{DoubleBottomDetector, DoubleTopDetector};
pub use engulfing::{BearishEngulfingDetector, BullishEngulfingDetector};
pub use flag::{BearFlagDetector, BullFlagDetector};
pub use head_shoulders::{HeadAndShouldersDetector, InverseHeadAndShouldersDetector};
pub use triangle::{AscendingTriangleDetector, DescendingTriangleDetector};
