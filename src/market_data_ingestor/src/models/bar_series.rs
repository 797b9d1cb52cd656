//! The ordered, duplicate-free record of bars for one granularity.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{bar::Bar, granularity::Granularity};

/// Two neighbouring bars are not in strictly increasing timestamp order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("timestamps not strictly increasing at row {index}: {current} follows {previous}")]
pub struct OrderViolation {
    /// Zero-based position of the offending bar.
    pub index: usize,
    pub previous: DateTime<Utc>,
    pub current: DateTime<Utc>,
}

/// A complete, self-describing series of bars for one [`Granularity`].
///
/// A `BarSeries` can only be built from bars whose timestamps are strictly
/// increasing, so holding one is proof of that invariant. Gaps between bars
/// are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    granularity: Granularity,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn empty(granularity: Granularity) -> Self {
        Self {
            granularity,
            bars: Vec::new(),
        }
    }

    /// Wraps already-ordered bars, rejecting any out-of-order or repeated timestamp.
    pub fn try_new(granularity: Granularity, bars: Vec<Bar>) -> Result<Self, OrderViolation> {
        check_strictly_increasing(&bars)?;
        Ok(Self { granularity, bars })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }
}

/// Returns the first position where `bars` stops being strictly increasing.
pub fn check_strictly_increasing(bars: &[Bar]) -> Result<(), OrderViolation> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(OrderViolation {
                index: i + 1,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(minute: u32) -> Bar {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap();
        Bar::new(ts, 100.0, 101.0, 99.0, 100.5, 3.0)
    }

    #[test]
    fn accepts_gapped_but_ordered_bars() {
        let s = BarSeries::try_new(Granularity::Minute, vec![bar(0), bar(1), bar(7)]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.first_timestamp(), Some(bar(0).timestamp));
        assert_eq!(s.last_timestamp(), Some(bar(7).timestamp));
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let err = BarSeries::try_new(Granularity::Minute, vec![bar(0), bar(1), bar(1)]).unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.previous, err.current);
    }

    #[test]
    fn rejects_descending_timestamp() {
        let err = BarSeries::try_new(Granularity::Minute, vec![bar(3), bar(2)]).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let s = BarSeries::empty(Granularity::Daily);
        assert!(s.is_empty());
        assert_eq!(s.last_timestamp(), None);
    }
}
