//! Yahoo Finance chart API (`/v8/finance/chart/{symbol}`).
//!
//! The endpoint needs no credentials but throttles clients without a browser-like
//! `User-Agent`. It serves one-minute bars only for a trailing window of roughly
//! thirty days, and at most about a week of them per request; daily bars go back
//! to the start of the listing.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{YahooChartConfig, YahooChartProvider};
