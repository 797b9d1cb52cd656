use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::granularity::Granularity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchWindowError {
    #[error("Fetch window start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Chunk span must be positive, got {span}")]
    NonPositiveChunk { span: Duration },

    #[error("Fetch window reaching {span} back from {end} is out of range")]
    OutOfRange { end: DateTime<Utc>, span: Duration },
}

/// Parameters for requesting bars of one symbol and granularity from a provider.
///
/// The window is inclusive on both ends; providers may return fewer rows than
/// the window spans (exchange downtime, still-forming bars) but never rows
/// outside of it on purpose. Nothing downstream relies on that, though: the
/// merge engine accepts whatever comes back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    /// Provider symbol, e.g. `"BTC-USD"`.
    pub symbol: String,

    /// Resolution of the requested bars.
    pub granularity: Granularity,

    /// Start of the requested time range (inclusive, UTC).
    pub start: DateTime<Utc>,

    /// End of the requested time range (inclusive, UTC).
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn new(
        symbol: impl Into<String>,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, FetchWindowError> {
        if start > end {
            return Err(FetchWindowError::Inverted { start, end });
        }
        Ok(Self {
            symbol: symbol.into(),
            granularity,
            start,
            end,
        })
    }

    /// A window whose start and end coincide covers nothing worth requesting.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Splits the window into consecutive sub-windows of at most `span` each.
    ///
    /// Consecutive chunks share their boundary instant, so a bar sitting exactly
    /// on a boundary may come back twice. The merge engine drops the duplicate.
    pub fn chunks(&self, span: Duration) -> Result<Vec<FetchWindow>, FetchWindowError> {
        if span <= Duration::zero() {
            return Err(FetchWindowError::NonPositiveChunk { span });
        }
        let mut out = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let chunk_end = (cursor + span).min(self.end);
            out.push(FetchWindow {
                symbol: self.symbol.clone(),
                granularity: self.granularity,
                start: cursor,
                end: chunk_end,
            });
            cursor = chunk_end;
        }
        Ok(out)
    }
}
