//! The update cycle.
//!
//! Per granularity the pipeline is `load -> plan window -> fetch -> merge ->
//! save -> summarize`. Granularities run one after the other, and a failure in
//! one is recorded in the [`CycleReport`] without touching the other. The
//! report file is regenerated at the end of every cycle from whatever each
//! granularity produced.

pub mod window;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use market_data_ingestor::{
    io::store::SeriesStore,
    models::{bar_series::BarSeries, granularity::Granularity, request_params::FetchWindow},
    providers::DataProvider,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::SyncConfig,
    error::CycleError,
    merge::{MergeReport, merge},
    report::{ReportSection, SectionStatus, render_report, write_report},
    summary::{Summary, summarize},
};

pub use window::{plan_backfill, plan_window};

/// Result of one successful pass over a granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStats {
    pub window: FetchWindow,
    pub fetched: usize,
    pub merge: MergeReport,
    /// Whether the series file was rewritten.
    pub saved: bool,
    pub records: usize,
    /// `None` while the series is still empty.
    pub summary: Option<Summary>,
}

#[derive(Debug)]
pub enum GranularityOutcome {
    Disabled,
    Synced(SyncStats),
    Failed(CycleError),
}

impl GranularityOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, GranularityOutcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub outcomes: Vec<(Granularity, GranularityOutcome)>,
    /// Where the report went, or why it could not be written.
    pub report: Result<PathBuf, CycleError>,
}

impl CycleReport {
    pub fn outcome(&self, granularity: Granularity) -> Option<&GranularityOutcome> {
        self.outcomes
            .iter()
            .find(|(g, _)| *g == granularity)
            .map(|(_, o)| o)
    }

    /// True when every enabled granularity synced and the report was written.
    pub fn is_success(&self) -> bool {
        self.report.is_ok() && !self.outcomes.iter().any(|(_, o)| o.is_failure())
    }
}

/// Drives the pipeline for one symbol against a provider and a store.
pub struct SeriesSync<P, S> {
    provider: P,
    store: S,
    config: SyncConfig,
}

impl<P: DataProvider, S: SeriesStore> SeriesSync<P, S> {
    pub fn new(provider: P, store: S, config: SyncConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Runs one full cycle over every enabled granularity and rewrites the report.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut outcomes = Vec::with_capacity(Granularity::ALL.len());
        for granularity in Granularity::ALL {
            if !self.config.policy(granularity).enabled {
                info!(granularity = %granularity, "granularity disabled; skipping");
                outcomes.push((granularity, GranularityOutcome::Disabled));
                continue;
            }
            let outcome = match self.sync_granularity(granularity, now).await {
                Ok(stats) => GranularityOutcome::Synced(stats),
                Err(e) => {
                    error!(granularity = %granularity, fatal = e.is_fatal(), error = %e, "update failed");
                    GranularityOutcome::Failed(e)
                }
            };
            outcomes.push((granularity, outcome));
        }

        let sections: Vec<ReportSection> = outcomes
            .iter()
            .filter_map(|(g, outcome)| {
                let status = match outcome {
                    GranularityOutcome::Disabled => return None,
                    GranularityOutcome::Synced(stats) => match &stats.summary {
                        Some(s) => SectionStatus::Summary(s.clone()),
                        None => SectionStatus::Empty,
                    },
                    GranularityOutcome::Failed(e) => SectionStatus::Failed(e.to_string()),
                };
                Some(self.section(*g, status))
            })
            .collect();
        let report = self.write_report(&sections, now);

        CycleReport { outcomes, report }
    }

    /// Incremental update of one granularity.
    pub async fn sync_granularity(
        &self,
        granularity: Granularity,
        now: DateTime<Utc>,
    ) -> Result<SyncStats, CycleError> {
        let existing = self.load(granularity)?;
        let policy = self.config.policy(granularity);
        let window = plan_window(
            &self.config.symbol,
            granularity,
            existing.last_timestamp(),
            now,
            &policy,
        )
        .map_err(|source| CycleError::Window {
            granularity,
            source,
        })?;
        self.ingest(existing, window).await
    }

    /// Fetches the last `days` days and merges them in. Never drops stored bars.
    pub async fn backfill(
        &self,
        granularity: Granularity,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<SyncStats, CycleError> {
        let existing = self.load(granularity)?;
        let policy = self.config.policy(granularity);
        let window = plan_backfill(&self.config.symbol, granularity, days, now, &policy)
            .map_err(|source| CycleError::Window {
                granularity,
                source,
            })?;
        info!(granularity = %granularity, start = %window.start, end = %window.end, "backfilling");
        self.ingest(existing, window).await
    }

    /// Report sections built from the stored files alone, without fetching.
    pub fn summarize_stored(&self) -> Vec<ReportSection> {
        Granularity::ALL
            .into_iter()
            .filter(|g| self.config.policy(*g).enabled)
            .map(|g| {
                let status = match self.load(g) {
                    Ok(series) => match summarize(&series) {
                        Ok(s) => SectionStatus::Summary(s),
                        Err(_) => SectionStatus::Empty,
                    },
                    Err(e) => {
                        warn!(granularity = %g, error = %e, "cannot summarize stored series");
                        SectionStatus::Failed(e.to_string())
                    }
                };
                self.section(g, status)
            })
            .collect()
    }

    /// Renders `sections` and replaces the report file.
    pub fn write_report(
        &self,
        sections: &[ReportSection],
        now: DateTime<Utc>,
    ) -> Result<PathBuf, CycleError> {
        let path = self.config.report_path();
        let text = render_report(&self.config.symbol, now, sections);
        let written = write_report(&path, &text).map_err(|source| CycleError::Report {
            path: path.clone(),
            source,
        })?;
        info!(path = %written.display(), "summary report written");
        Ok(written)
    }

    fn load(&self, granularity: Granularity) -> Result<BarSeries, CycleError> {
        self.store
            .load(granularity)
            .map_err(|e| CycleError::from_load(granularity, e))
    }

    fn section(&self, granularity: Granularity, status: SectionStatus) -> ReportSection {
        let file_name = self
            .store
            .location(granularity)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ReportSection {
            granularity,
            file_name,
            status,
        }
    }

    async fn ingest(
        &self,
        existing: BarSeries,
        window: FetchWindow,
    ) -> Result<SyncStats, CycleError> {
        let granularity = window.granularity;

        let bars = if window.is_empty() {
            debug!(granularity = %granularity, "fetch window is empty; nothing to request");
            Vec::new()
        } else {
            self.provider
                .fetch_bars(&window)
                .await
                .map_err(|source| CycleError::SourceUnavailable {
                    granularity,
                    source,
                })?
        };
        let fetched = bars.len();

        let (merged, merge_report) =
            merge(existing, bars).map_err(|source| CycleError::MergeInvariant {
                granularity,
                source,
            })?;

        // An unchanged series is only written when no file exists yet.
        let saved = if merge_report.changed() || !self.store.exists(granularity) {
            let path = self
                .store
                .save(&merged)
                .map_err(|source| CycleError::Store {
                    granularity,
                    source,
                })?;
            debug!(granularity = %granularity, path = %path.display(), "series saved");
            true
        } else {
            false
        };

        info!(
            granularity = %granularity,
            fetched,
            added = merge_report.added,
            revised = merge_report.revised,
            duplicates = merge_report.duplicates,
            records = merged.len(),
            saved,
            "series updated"
        );

        let summary = match summarize(&merged) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!(granularity = %granularity, "{e}");
                None
            }
        };

        Ok(SyncStats {
            window,
            fetched,
            merge: merge_report,
            saved,
            records: merged.len(),
            summary,
        })
    }
}
