//! Fetching and persisting OHLCV bar series.
//!
//! - [`models`]: the vendor-agnostic [`Bar`](models::bar::Bar), its ordered
//!   [`BarSeries`](models::bar_series::BarSeries), granularities and fetch windows.
//! - [`providers`]: the [`DataProvider`](providers::DataProvider) seam, the Yahoo
//!   chart implementation, and request chunking/pacing.
//! - [`io`]: the [`SeriesStore`](io::store::SeriesStore) seam and its CSV implementation.

pub mod io;
pub mod models;
pub mod providers;
