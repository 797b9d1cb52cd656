//! Splitting long windows into provider-sized requests.
//!
//! Quote vendors cap how much history a single call may span (minute bars in
//! particular). [`ChunkedProvider`] wraps any [`DataProvider`], splits each
//! window into consecutive chunks no longer than the per-granularity limit,
//! and requests them in order. Requests are paced through a `governor` token
//! bucket so a long backfill does not trip the vendor's throttling.
//!
//! A failed chunk fails the whole fetch. Keeping the bars of the chunks that
//! did succeed would let the persisted series jump over the missing span, and
//! the next incremental run (which starts at the last stored timestamp) would
//! never look back at it.

use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::Duration;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::models::{bar::Bar, granularity::Granularity, request_params::FetchWindow};
use crate::providers::{
    ChunkSnafu, DataProvider, ProviderError, ProviderInitError, ValidationSnafu, ZeroRateSnafu,
};

/// Maximum span of one upstream request, per granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub minute: Duration,
    pub daily: Duration,
}

impl ChunkPolicy {
    pub fn span_for(&self, granularity: Granularity) -> Duration {
        match granularity {
            Granularity::Minute => self.minute,
            Granularity::Daily => self.daily,
        }
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            minute: Duration::days(7),
            daily: Duration::days(365),
        }
    }
}

pub struct ChunkedProvider<P> {
    inner: P,
    policy: ChunkPolicy,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl<P: DataProvider> ChunkedProvider<P> {
    /// Wraps `inner` without any request pacing.
    pub fn new(inner: P, policy: ChunkPolicy) -> Self {
        Self {
            inner,
            policy,
            limiter: None,
        }
    }

    /// Paces upstream calls to at most `requests_per_minute`.
    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Result<Self, ProviderInitError> {
        let rate = NonZeroU32::new(requests_per_minute).context(ZeroRateSnafu)?;
        self.limiter = Some(RateLimiter::direct(Quota::per_minute(rate)));
        Ok(self)
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: DataProvider> DataProvider for ChunkedProvider<P> {
    async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
        let span = self.policy.span_for(window.granularity);
        let chunks = window.chunks(span).map_err(|e| {
            ValidationSnafu {
                message: e.to_string(),
            }
            .build()
        })?;

        let mut bars = Vec::new();
        for chunk in &chunks {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }
            let fetched = self.inner.fetch_bars(chunk).await.context(ChunkSnafu {
                start: chunk.start,
                end: chunk.end,
            })?;
            debug!(
                granularity = %chunk.granularity,
                start = %chunk.start,
                end = %chunk.end,
                rows = fetched.len(),
                "fetched chunk"
            );
            bars.extend(fetched);
        }
        Ok(bars)
    }
}
