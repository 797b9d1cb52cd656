//! Choosing what to ask the provider for.

use chrono::{DateTime, Duration, Utc};
use market_data_ingestor::models::{
    granularity::Granularity,
    request_params::{FetchWindow, FetchWindowError},
};
use tracing::warn;

use crate::config::GranularityPolicy;

/// Window for an incremental update.
///
/// Starts at the last persisted bar (rewound by the configured overlap), or
/// `lookback` before `now` when nothing is stored yet. Ends at `now`.
pub fn plan_window(
    symbol: &str,
    granularity: Granularity,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    policy: &GranularityPolicy,
) -> Result<FetchWindow, FetchWindowError> {
    let start = match last {
        Some(ts) => rewind(ts, policy.overlap)?,
        None => rewind(now, policy.lookback)?,
    };
    bounded(symbol, granularity, start, now, policy)
}

/// Window for an explicit backfill of the last `days` days.
pub fn plan_backfill(
    symbol: &str,
    granularity: Granularity,
    days: u32,
    now: DateTime<Utc>,
    policy: &GranularityPolicy,
) -> Result<FetchWindow, FetchWindowError> {
    let start = rewind(now, Duration::days(days.into()))?;
    bounded(symbol, granularity, start, now, policy)
}

fn rewind(from: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>, FetchWindowError> {
    from.checked_sub_signed(span)
        .ok_or(FetchWindowError::OutOfRange { end: from, span })
}

fn bounded(
    symbol: &str,
    granularity: Granularity,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &GranularityPolicy,
) -> Result<FetchWindow, FetchWindowError> {
    let mut start = start;
    if let Some(horizon) = policy.max_history.and_then(|h| now.checked_sub_signed(h)) {
        if start < horizon {
            // Bars before the horizon are gone upstream; the span stays a gap.
            warn!(
                granularity = %granularity,
                requested = %start,
                horizon = %horizon,
                "fetch start is beyond the provider's history horizon; clamping"
            );
            start = horizon;
        }
    }
    FetchWindow::new(symbol, granularity, start.min(now), now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_series_uses_lookback() {
        let policy = GranularityPolicy::default_for(Granularity::Daily);
        let w = plan_window("BTC-USD", Granularity::Daily, None, now(), &policy).unwrap();
        assert_eq!(w.start, now() - Duration::days(30));
        assert_eq!(w.end, now());
    }

    #[test]
    fn incremental_start_is_last_stored_bar() {
        let policy = GranularityPolicy::default_for(Granularity::Minute);
        let last = Utc.with_ymd_and_hms(2025, 6, 30, 11, 42, 0).unwrap();
        let w = plan_window("BTC-USD", Granularity::Minute, Some(last), now(), &policy).unwrap();
        assert_eq!(w.start, last);
    }

    #[test]
    fn overlap_rewinds_start() {
        let mut policy = GranularityPolicy::default_for(Granularity::Minute);
        policy.overlap = Duration::minutes(10);
        let last = Utc.with_ymd_and_hms(2025, 6, 30, 11, 42, 0).unwrap();
        let w = plan_window("BTC-USD", Granularity::Minute, Some(last), now(), &policy).unwrap();
        assert_eq!(w.start, last - Duration::minutes(10));
    }

    #[test]
    fn stale_minute_series_is_clamped_to_horizon() {
        let policy = GranularityPolicy::default_for(Granularity::Minute);
        let last = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let w = plan_window("BTC-USD", Granularity::Minute, Some(last), now(), &policy).unwrap();
        assert_eq!(w.start, now() - Duration::days(29));
    }

    #[test]
    fn daily_has_no_horizon() {
        let policy = GranularityPolicy::default_for(Granularity::Daily);
        let w = plan_backfill("BTC-USD", Granularity::Daily, 3650, now(), &policy).unwrap();
        assert_eq!(w.start, now() - Duration::days(3650));
    }

    #[test]
    fn backfill_beyond_representable_dates_is_an_error() {
        let policy = GranularityPolicy::default_for(Granularity::Daily);
        let err = plan_backfill("BTC-USD", Granularity::Daily, 200_000_000, now(), &policy)
            .unwrap_err();
        assert!(matches!(err, FetchWindowError::OutOfRange { .. }));
    }

    #[test]
    fn future_last_timestamp_yields_empty_window() {
        let policy = GranularityPolicy::default_for(Granularity::Daily);
        let last = now() + Duration::days(1);
        let w = plan_window("BTC-USD", Granularity::Daily, Some(last), now(), &policy).unwrap();
        assert!(w.is_empty());
    }
}
