//! Durable storage of one [`BarSeries`] per granularity.

use std::path::PathBuf;

use snafu::{Backtrace, Snafu};

use crate::models::{bar_series::BarSeries, granularity::Granularity};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// The persisted file exists but violates the series invariants.
    ///
    /// Never repaired automatically: overwriting it could discard valid history.
    #[snafu(display("Corrupt series file {}: {reason}", path.display()))]
    Corrupt {
        path: PathBuf,
        reason: String,
        backtrace: Backtrace,
    },

    /// A required column is absent from the header row.
    #[snafu(display("Corrupt series file {}: missing column `{column}`", path.display()))]
    MissingColumn {
        path: PathBuf,
        column: String,
        backtrace: Backtrace,
    },

    /// An error occurred while writing the table.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// A generic I/O error.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl StoreError {
    /// True when the stored file itself is bad, as opposed to the disk being unavailable.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StoreError::Corrupt { .. } | StoreError::MissingColumn { .. }
        )
    }
}

/// Persists and reloads series, one per granularity.
pub trait SeriesStore {
    /// Reads the persisted series, or an empty one when nothing was saved yet.
    fn load(&self, granularity: Granularity) -> Result<BarSeries, StoreError>;

    /// Replaces the persisted series atomically. Readers see either the old
    /// file or the new one, never a partial write.
    fn save(&self, series: &BarSeries) -> Result<PathBuf, StoreError>;

    /// Where the series for `granularity` lives.
    fn location(&self, granularity: Granularity) -> PathBuf;

    /// Whether a series for `granularity` was ever saved, even an empty one.
    fn exists(&self, granularity: Granularity) -> bool;
}
