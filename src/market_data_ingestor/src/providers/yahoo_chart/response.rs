use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::bar::Bar;

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Deserialize, Debug)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ChartError {
    /// Yahoo answers "Not Found" when the window holds no rows at all.
    pub fn is_no_data(&self) -> bool {
        self.code.eq_ignore_ascii_case("Not Found")
    }
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    /// Absent when the window contains no bars.
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
}

/// Column-oriented OHLCV arrays, index-aligned with `ChartResult::timestamp`.
/// Yahoo fills slots with `null` where no trade happened.
#[derive(Deserialize, Debug, Default)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Converts the column arrays into bars, skipping slots with any missing price.
    /// A missing volume is read as zero.
    pub fn into_bars(self) -> Vec<Bar> {
        let Some(timestamps) = self.timestamp else {
            return Vec::new();
        };
        let Some(q) = self.indicators.quote.into_iter().next() else {
            return Vec::new();
        };

        timestamps
            .into_iter()
            .enumerate()
            .filter_map(|(i, secs)| {
                let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)?;
                let open = (*q.open.get(i)?)?;
                let high = (*q.high.get(i)?)?;
                let low = (*q.low.get(i)?)?;
                let close = (*q.close.get(i)?)?;
                let volume = q.volume.get(i).copied().flatten().unwrap_or(0.0);
                Some(Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
    }
}
