//! UTC bucket mapping and gap detection.
//!
//! - One stable epoch: Unix (1970-01-01T00:00:00Z).
//! - Both granularities are fixed-width, so bucket math is plain second arithmetic.
//! - A gap is a run of empty buckets between two stored bars. Gaps are expected
//!   (exchange downtime, provider holes, spans older than the provider's horizon)
//!   and are reported, never treated as errors.

use chrono::{DateTime, Duration, Utc};
use market_data_ingestor::models::{bar_series::BarSeries, granularity::Granularity};

/// Unix epoch start (1970-01-01T00:00:00Z).
pub const EPOCH_UNIX: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

fn bucket_secs(granularity: Granularity) -> i64 {
    granularity.step().num_seconds()
}

/// Compute the bucket id for a UTC timestamp.
pub fn bucket_id(ts_utc: DateTime<Utc>, granularity: Granularity) -> i64 {
    let secs = ts_utc.signed_duration_since(EPOCH_UNIX).num_seconds();
    secs.div_euclid(bucket_secs(granularity))
}

/// Get the UTC start instant for a bucket id.
pub fn bucket_start_utc(id: i64, granularity: Granularity) -> DateTime<Utc> {
    EPOCH_UNIX + Duration::seconds(id * bucket_secs(granularity))
}

/// Empty buckets between two consecutive stored bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Last bar before the hole.
    pub after: DateTime<Utc>,
    /// First bar after the hole.
    pub resumes: DateTime<Utc>,
    /// Number of empty buckets in between.
    pub missing: i64,
}

impl Gap {
    /// Start of the first empty bucket.
    pub fn first_missing(&self, granularity: Granularity) -> DateTime<Utc> {
        bucket_start_utc(bucket_id(self.after, granularity) + 1, granularity)
    }
}

/// Lists every gap in `series`, oldest first.
pub fn find_gaps(series: &BarSeries) -> Vec<Gap> {
    let g = series.granularity();
    series
        .bars()
        .windows(2)
        .filter_map(|pair| {
            let missing = bucket_id(pair[1].timestamp, g) - bucket_id(pair[0].timestamp, g) - 1;
            (missing > 0).then_some(Gap {
                after: pair[0].timestamp,
                resumes: pair[1].timestamp,
                missing,
            })
        })
        .collect()
}

// -------------------- tests --------------------
#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use market_data_ingestor::models::bar::Bar;

    use super::*;

    fn bar(ts: DateTime<Utc>) -> Bar {
        Bar::new(ts, 1.0, 1.0, 1.0, 1.0, 0.0)
    }

    #[test]
    fn minute_roundtrip() {
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let id = bucket_id(t, Granularity::Minute);
        assert_eq!(
            bucket_start_utc(id, Granularity::Minute),
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap()
        );
        assert_eq!(bucket_id(bucket_start_utc(id, Granularity::Minute), Granularity::Minute), id);
    }

    #[test]
    fn pre_epoch_timestamps_floor_downwards() {
        let t = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 30).unwrap();
        assert_eq!(bucket_id(t, Granularity::Minute), -1);
        assert_eq!(bucket_id(t, Granularity::Daily), -1);
    }

    #[test]
    fn daily_gap_over_missing_days() {
        let d = |day| Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap();
        let s = BarSeries::try_new(
            Granularity::Daily,
            vec![bar(d(1)), bar(d(2)), bar(d(6)), bar(d(7))],
        )
        .unwrap();

        let gaps = find_gaps(&s);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].missing, 3);
        assert_eq!(gaps[0].first_missing(Granularity::Daily), d(3));
        assert_eq!(gaps[0].resumes, d(6));
    }

    #[test]
    fn contiguous_series_has_no_gaps() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let bars = (0..30).map(|i| bar(base + Duration::minutes(i))).collect();
        let s = BarSeries::try_new(Granularity::Minute, bars).unwrap();
        assert!(find_gaps(&s).is_empty());
    }
}
