//! Reconciling a freshly fetched window into a persisted series.
//!
//! The rule is last-writer-wins keyed by timestamp:
//! - an incoming bar at a new timestamp is inserted;
//! - an incoming bar at a stored timestamp replaces the stored bar only when
//!   some field differs (the provider revised a still-forming bar);
//! - an identical incoming bar is a duplicate and is dropped.
//!
//! Incoming bars may arrive in any order and may repeat; within one batch the
//! last bar for a timestamp wins. The result is always sorted, and it never
//! loses a timestamp that was already stored, so a merge can only grow the
//! history.

use std::collections::{BTreeMap, btree_map::Entry};

use chrono::{DateTime, Utc};
use market_data_ingestor::models::{
    bar::Bar,
    bar_series::{BarSeries, OrderViolation},
};

/// What a merge did, for logging and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Bars at timestamps the series did not have.
    pub added: usize,
    /// Stored bars that ended up replaced by a differing incoming bar.
    pub revised: usize,
    /// Incoming bars that left no trace: exact duplicates of what is kept, or
    /// bars superseded later in the same batch.
    pub duplicates: usize,
}

impl MergeReport {
    /// True when the merged series differs from the one passed in.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.revised > 0
    }
}

/// Merges `incoming` into `existing`.
///
/// Fails only if the rebuilt series is not strictly increasing, which the
/// keyed rebuild rules out; the check stays as a guard on the invariant.
pub fn merge(
    existing: BarSeries,
    incoming: impl IntoIterator<Item = Bar>,
) -> Result<(BarSeries, MergeReport), OrderViolation> {
    let granularity = existing.granularity();
    let mut by_ts: BTreeMap<DateTime<Utc>, Bar> = existing
        .into_bars()
        .into_iter()
        .map(|bar| (bar.timestamp, bar))
        .collect();

    // Collapse the batch first so only its final word per timestamp is compared.
    let mut received = 0usize;
    let mut latest: BTreeMap<DateTime<Utc>, Bar> = BTreeMap::new();
    for bar in incoming {
        received += 1;
        latest.insert(bar.timestamp, bar);
    }

    let mut report = MergeReport::default();
    for (ts, bar) in latest {
        match by_ts.entry(ts) {
            Entry::Vacant(slot) => {
                slot.insert(bar);
                report.added += 1;
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() != bar {
                    slot.insert(bar);
                    report.revised += 1;
                }
            }
        }
    }
    report.duplicates = received - report.added - report.revised;

    let series = BarSeries::try_new(granularity, by_ts.into_values().collect())?;
    Ok((series, report))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use market_data_ingestor::models::granularity::Granularity;

    use super::*;

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap() + Duration::minutes(i)
    }

    fn bar(i: i64, close: f64) -> Bar {
        Bar::new(t(i), 100.0, 110.0, 90.0, close, 1.0)
    }

    fn series(bars: Vec<Bar>) -> BarSeries {
        BarSeries::try_new(Granularity::Minute, bars).unwrap()
    }

    #[test]
    fn empty_incoming_is_a_no_op() {
        let s = series(vec![bar(0, 100.0), bar(1, 101.0)]);
        let (merged, report) = merge(s.clone(), Vec::new()).unwrap();
        assert_eq!(merged, s);
        assert!(!report.changed());
    }

    #[test]
    fn empty_existing_takes_incoming_sorted_and_deduplicated() {
        let incoming = vec![bar(2, 102.0), bar(0, 100.0), bar(1, 101.0), bar(0, 100.0)];
        let (merged, report) = merge(BarSeries::empty(Granularity::Minute), incoming).unwrap();

        assert_eq!(merged.bars(), &[bar(0, 100.0), bar(1, 101.0), bar(2, 102.0)]);
        assert_eq!(report.added, 3);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.revised, 0);
    }

    #[test]
    fn revised_bar_replaces_stored_one() {
        let s = series(vec![bar(0, 100.0)]);
        let (merged, report) = merge(s, vec![bar(0, 105.0)]).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.bars()[0].close, 105.0);
        assert_eq!(report.revised, 1);
        assert_eq!(report.added, 0);
    }

    #[test]
    fn trailing_revision_and_new_bar() {
        let s = series(vec![bar(1, 100.0), bar(2, 101.0)]);
        let (merged, report) = merge(s, vec![bar(2, 101.5), bar(3, 102.0)]).unwrap();

        assert_eq!(
            merged.bars(),
            &[bar(1, 100.0), bar(2, 101.5), bar(3, 102.0)]
        );
        assert_eq!(
            report,
            MergeReport {
                added: 1,
                revised: 1,
                duplicates: 0
            }
        );
    }

    #[test]
    fn overlap_inside_existing_adds_no_rows() {
        let s = series((0..10).map(|i| bar(i, 100.0 + i as f64)).collect());
        let incoming: Vec<Bar> = (5..10).map(|i| bar(i, 100.0 + i as f64)).collect();
        let (merged, report) = merge(s.clone(), incoming).unwrap();

        assert_eq!(merged, s);
        assert_eq!(report.duplicates, 5);
        assert!(!report.changed());
    }

    #[test]
    fn last_bar_in_batch_wins() {
        let (merged, report) = merge(
            series(vec![bar(0, 100.0)]),
            vec![bar(1, 101.0), bar(1, 101.7), bar(0, 99.0), bar(0, 98.0)],
        )
        .unwrap();

        assert_eq!(merged.bars(), &[bar(0, 98.0), bar(1, 101.7)]);
        assert_eq!(report.added, 1);
        assert_eq!(report.revised, 1);
    }

    #[test]
    fn revision_reverted_within_batch_is_no_change() {
        let s = series(vec![bar(0, 100.0), bar(1, 101.0)]);
        let (merged, report) = merge(s.clone(), vec![bar(1, 104.0), bar(1, 101.0)]).unwrap();

        assert_eq!(merged, s);
        assert_eq!(report.revised, 0);
        assert_eq!(report.duplicates, 2);
        assert!(!report.changed());
    }

    #[test]
    fn gaps_are_preserved() {
        let s = series(vec![bar(0, 100.0), bar(60, 101.0)]);
        let (merged, _) = merge(s, vec![bar(240, 103.0)]).unwrap();
        let stamps: Vec<_> = merged.bars().iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![t(0), t(60), t(240)]);
    }
}
