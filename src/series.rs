//! Column extraction from candle series
//!
//! Detectors and indicators operate on plain `f64` columns rather than on the
//! bar type directly, so one [`SeriesView`] is extracted per timeframe per
//! pipeline run and shared by every consumer.

use crate::Ohlcv;

/// Owned OHLCV columns for one timeframe, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SeriesView {
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl SeriesView {
    /// Extract columns from a bar slice.
    ///
    /// If any bar reports a non-finite volume the whole volume column is
    /// zeroed, so volume-based checks degrade to "unmeasurable" instead of
    /// poisoning downstream averages.
    pub fn from_bars<T: Ohlcv>(bars: &[T]) -> Self {
        let mut view = SeriesView {
            opens: Vec::with_capacity(bars.len()),
            highs: Vec::with_capacity(bars.len()),
            lows: Vec::with_capacity(bars.len()),
            closes: Vec::with_capacity(bars.len()),
            volumes: Vec::with_capacity(bars.len()),
        };
        for bar in bars {
            view.opens.push(bar.open());
            view.highs.push(bar.high());
            view.lows.push(bar.low());
            view.closes.push(bar.close());
            view.volumes.push(bar.volume());
        }
        if view.volumes.iter().any(|v| !v.is_finite()) {
            view.volumes = vec![0.0; view.closes.len()];
        }
        view
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Close of the most recent bar.
    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}
