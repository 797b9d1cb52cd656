//! Incremental, multi-granularity sync of a quote provider into on-disk series.
//!
//! One cycle loads each granularity's persisted series, asks the provider for
//! the trailing window since the last stored bar, merges the answer in, writes
//! the series back atomically, and regenerates the summary report. The
//! persisted files are the only state; nothing survives between cycles in memory.
//!
//! - [`merge`]: last-writer-wins reconciliation keyed by timestamp.
//! - [`gaps`]: fixed-grid bucketing used to find inactive spans.
//! - [`summary`] / [`report`]: derived statistics and the plain-text report.
//! - [`sync`]: the per-granularity pipeline and the cycle driver.
//! - [`config`]: TOML configuration with environment overrides.

pub mod config;
pub mod error;
pub mod gaps;
pub mod logging;
pub mod merge;
pub mod report;
pub mod summary;
pub mod sync;
