//! Analysis columns written next to the OHLCV fields.
//!
//! These values are recomputed from the whole series on every save and are
//! never read back: the OHLCV columns stay the only source of truth.

use crate::models::bar::Bar;

/// Per-bar derived values, aligned index-for-index with the source bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFields {
    /// Close-to-close percent change. `None` for the first bar or a zero previous close.
    pub returns: Option<f64>,
    /// `high - low`.
    pub price_range: f64,
    /// Cumulative volume-weighted close since the first bar. `None` until any volume trades.
    pub vwap: Option<f64>,
}

pub fn derive(bars: &[Bar]) -> Vec<DerivedFields> {
    let mut out = Vec::with_capacity(bars.len());
    let mut prev_close: Option<f64> = None;
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for bar in bars {
        let returns = prev_close
            .filter(|p| *p != 0.0)
            .map(|p| (bar.close - p) / p);

        cum_pv += bar.volume * bar.close;
        cum_vol += bar.volume;
        let vwap = (cum_vol > 0.0).then(|| cum_pv / cum_vol);

        out.push(DerivedFields {
            returns,
            price_range: bar.price_range(),
            vwap,
        });
        prev_close = Some(bar.close);
    }
    out
}
