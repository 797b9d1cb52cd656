use std::path::PathBuf;

use market_data_ingestor::{
    io::store::StoreError,
    models::{
        bar_series::OrderViolation, granularity::Granularity, request_params::FetchWindowError,
    },
    providers::ProviderError,
};
use thiserror::Error;

/// Why one granularity's cycle did not complete.
///
/// A `CycleError` never leaves its granularity: the orchestrator records it and
/// moves on to the next one.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Provider or network failure. Transient; the next scheduled cycle retries.
    #[error("source unavailable for {granularity} bars: {source}")]
    SourceUnavailable {
        granularity: Granularity,
        source: ProviderError,
    },

    /// The persisted file is unreadable as a series. The file is left as is.
    #[error("corrupt {granularity} series: {source}")]
    CorruptSeries {
        granularity: Granularity,
        source: StoreError,
    },

    /// Merging produced an unordered series. Treated like a corrupt series.
    #[error("merged {granularity} series violates ordering: {source}")]
    MergeInvariant {
        granularity: Granularity,
        source: OrderViolation,
    },

    /// The disk could not be read or written.
    #[error("storage failure for {granularity} series: {source}")]
    Store {
        granularity: Granularity,
        source: StoreError,
    },

    #[error("cannot plan {granularity} fetch window: {source}")]
    Window {
        granularity: Granularity,
        source: FetchWindowError,
    },

    #[error("failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CycleError {
    /// Classifies a store failure on load: bad contents versus bad disk.
    pub fn from_load(granularity: Granularity, source: StoreError) -> Self {
        if source.is_corrupt() {
            CycleError::CorruptSeries {
                granularity,
                source,
            }
        } else {
            CycleError::Store {
                granularity,
                source,
            }
        }
    }

    /// True for failures an operator has to look at before the next cycle can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CycleError::CorruptSeries { .. } | CycleError::MergeInvariant { .. }
        )
    }
}
