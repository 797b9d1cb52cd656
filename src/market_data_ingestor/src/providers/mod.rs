//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, the single seam between the
//! ingestion pipeline and any quote vendor. A provider answers one question:
//! "which bars do you have for this [`FetchWindow`]?"
//!
//! Providers return rows exactly as the vendor hands them out. They do not
//! deduplicate, sort or validate ordering; reconciling overlapping fetches is
//! the merge engine's job. An empty vector is a valid answer (market closed,
//! nothing new yet) and is not an error.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{bar::Bar, request_params::FetchWindow};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct NothingNew;
//!
//! #[async_trait]
//! impl DataProvider for NothingNew {
//!     async fn fetch_bars(&self, _window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod chunked;
pub mod yahoo_chart;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snafu::{Backtrace, Snafu};

use crate::models::{bar::Bar, request_params::FetchWindow};

/// Trait for fetching time-series bar data from a market data provider.
///
/// The trait is async and object safe, so the orchestrator can hold a
/// `Box<dyn DataProvider>` picked at runtime.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches the bars the provider has for `window`.
    ///
    /// # Returns
    ///
    /// * `Ok(bars)` - Rows in provider order; possibly empty, possibly overlapping earlier fetches.
    /// * `Err(ProviderError)` - The source was unreachable or answered with an error.
    async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError>;
}

#[async_trait]
impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
        (**self).fetch_bars(window).await
    }
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Configured header value contains invalid characters.
    #[snafu(display("Invalid header value for {header}: {source}"))]
    InvalidHeader {
        header: String,
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// A request pacing quota of zero was configured.
    #[snafu(display("Request rate must be positive"))]
    ZeroRate { backtrace: Backtrace },
}

/// Errors that can occur within a `DataProvider` implementation.
///
/// Every variant means the source is unavailable for this cycle. None of them
/// is retried in-process; the next scheduled cycle asks again.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded.
    #[snafu(display("Malformed provider response: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// One chunk of a split request failed; the whole fetch is abandoned.
    #[snafu(display("Chunk {start} .. {end} failed: {source}"))]
    Chunk {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[snafu(source(from(ProviderError, Box::new)))]
        source: Box<ProviderError>,
    },
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::models::granularity::Granularity;

    use super::*;

    struct YahooStub;
    struct OfflineStub;

    #[async_trait]
    impl DataProvider for YahooStub {
        async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
            Ok(vec![Bar::new(window.start, 1.0, 1.0, 1.0, 1.0, 0.0)])
        }
    }

    #[async_trait]
    impl DataProvider for OfflineStub {
        async fn fetch_bars(&self, _window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
            ApiSnafu {
                message: "offline",
            }
            .fail()
        }
    }

    // Decided at runtime, which only works through `Box<dyn DataProvider>`.
    fn get_provider(name: &str) -> Box<dyn DataProvider> {
        if name == "yahoo" {
            Box::new(YahooStub)
        } else {
            Box::new(OfflineStub)
        }
    }

    #[tokio::test]
    async fn test_dynamic_provider() {
        let now = Utc::now();
        let window =
            FetchWindow::new("BTC-USD", Granularity::Daily, now - Duration::days(1), now).unwrap();

        let bars = get_provider("yahoo").fetch_bars(&window).await.unwrap();
        assert_eq!(bars.len(), 1);

        let err = get_provider("offline").fetch_bars(&window).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
    }
}
