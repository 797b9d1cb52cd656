//! Aggregate statistics derived from a series.
//!
//! A [`Summary`] is recomputed from the full series every cycle and never
//! stored, so it cannot drift from the data it describes.

use chrono::{DateTime, Utc};
use market_data_ingestor::models::{bar_series::BarSeries, granularity::Granularity};
use thiserror::Error;

use crate::gaps::{Gap, find_gaps};

/// The series has no rows; statistics over it would be meaningless.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no {granularity} history to summarize")]
pub struct EmptyHistory {
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub granularity: Granularity,
    pub records: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub min_close: f64,
    pub max_close: f64,
    pub mean_close: f64,
    /// Number of runs of empty buckets between stored bars.
    pub gap_count: usize,
    /// The gap with the most empty buckets, earliest on ties.
    pub largest_gap: Option<Gap>,
}

pub fn summarize(series: &BarSeries) -> Result<Summary, EmptyHistory> {
    let granularity = series.granularity();
    let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) else {
        return Err(EmptyHistory { granularity });
    };

    let bars = series.bars();
    let (min_close, max_close, sum) = bars.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(lo, hi, sum), b| (lo.min(b.close), hi.max(b.close), sum + b.close),
    );

    let gaps = find_gaps(series);
    let largest_gap = gaps
        .iter()
        .copied()
        .fold(None::<Gap>, |best, g| match best {
            Some(b) if b.missing >= g.missing => Some(b),
            _ => Some(g),
        });

    Ok(Summary {
        granularity,
        records: bars.len(),
        first,
        last,
        min_close,
        max_close,
        mean_close: sum / bars.len() as f64,
        gap_count: gaps.len(),
        largest_gap,
    })
}
