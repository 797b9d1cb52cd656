//! Sampling resolution of a persisted series.
//!
//! Only two resolutions are tracked: one-minute bars and daily bars. Both are
//! fixed-width in UTC, so a [`Granularity`] maps to a single [`Duration`] step.

use std::{fmt, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GranularityError {
    #[error("Invalid granularity: {input} (expected one of: minute, 1m, daily, 1d)")]
    Unknown { input: String },
}

/// Sampling resolution of a [`BarSeries`](crate::models::bar_series::BarSeries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One bar per UTC minute.
    Minute,
    /// One bar per UTC day.
    Daily,
}

impl Granularity {
    /// Every tracked granularity, in the order a sync cycle visits them.
    pub const ALL: [Granularity; 2] = [Granularity::Minute, Granularity::Daily];

    /// Nominal spacing between two consecutive bars while the market is active.
    pub fn step(self) -> Duration {
        match self {
            Granularity::Minute => Duration::minutes(1),
            Granularity::Daily => Duration::days(1),
        }
    }

    /// Lowercase name used in file names, config sections and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Daily => "daily",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = GranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "1m" | "min" => Ok(Granularity::Minute),
            "daily" | "day" | "1d" => Ok(Granularity::Daily),
            _ => Err(GranularityError::Unknown {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_interval_codes() {
        assert_eq!("minute".parse::<Granularity>(), Ok(Granularity::Minute));
        assert_eq!("1m".parse::<Granularity>(), Ok(Granularity::Minute));
        assert_eq!(" Daily ".parse::<Granularity>(), Ok(Granularity::Daily));
        assert_eq!("1D".parse::<Granularity>(), Ok(Granularity::Daily));
    }

    #[test]
    fn rejects_unknown_resolution() {
        match "5m".parse::<Granularity>() {
            Err(GranularityError::Unknown { input }) => assert_eq!(input, "5m"),
            other => panic!("expected Unknown error, got {other:?}"),
        }
    }

    #[test]
    fn display_matches_as_str() {
        for g in Granularity::ALL {
            assert_eq!(g.to_string(), g.as_str());
        }
    }

    #[test]
    fn steps_are_fixed_width() {
        assert_eq!(Granularity::Minute.step(), Duration::seconds(60));
        assert_eq!(Granularity::Daily.step(), Duration::seconds(86_400));
    }
}
