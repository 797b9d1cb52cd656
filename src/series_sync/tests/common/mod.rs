#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use market_data_ingestor::{
    io::{
        csv_store::CsvSeriesStore,
        store::{SeriesStore, StoreError},
    },
    models::{
        bar::Bar, bar_series::BarSeries, granularity::Granularity, request_params::FetchWindow,
    },
    providers::{ApiSnafu, DataProvider, ProviderError},
};
use series_sync::{config::SyncConfig, sync::SeriesSync};
use tempfile::TempDir;

/// One scripted answer: bars, or the message of an API failure.
pub type Reply = Result<Vec<Bar>, String>;

/// In-memory provider that replays scripted answers per granularity and
/// records every window it was asked for. An unscripted call returns no bars.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<Granularity, VecDeque<Reply>>>,
    calls: Mutex<Vec<FetchWindow>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, granularity: Granularity, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(granularity)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<FetchWindow> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, granularity: Granularity) -> Vec<FetchWindow> {
        self.calls()
            .into_iter()
            .filter(|w| w.granularity == granularity)
            .collect()
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
        self.calls.lock().unwrap().push(window.clone());
        let next = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&window.granularity)
            .and_then(|q| q.pop_front());
        match next {
            Some(Ok(bars)) => Ok(bars),
            Some(Err(message)) => ApiSnafu { message }.fail(),
            None => Ok(Vec::new()),
        }
    }
}

/// Series kept in memory; counts how often each granularity was saved.
#[derive(Default)]
pub struct MemoryStore {
    series: Mutex<HashMap<Granularity, BarSeries>>,
    saves: Mutex<HashMap<Granularity, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self, granularity: Granularity) -> usize {
        self.saves
            .lock()
            .unwrap()
            .get(&granularity)
            .copied()
            .unwrap_or_default()
    }
}

impl SeriesStore for MemoryStore {
    fn load(&self, granularity: Granularity) -> Result<BarSeries, StoreError> {
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(&granularity)
            .cloned()
            .unwrap_or_else(|| BarSeries::empty(granularity)))
    }

    fn save(&self, series: &BarSeries) -> Result<PathBuf, StoreError> {
        let g = series.granularity();
        self.series.lock().unwrap().insert(g, series.clone());
        *self.saves.lock().unwrap().entry(g).or_default() += 1;
        Ok(self.location(g))
    }

    fn location(&self, granularity: Granularity) -> PathBuf {
        PathBuf::from(format!("memory/{granularity}"))
    }

    fn exists(&self, granularity: Granularity) -> bool {
        self.series.lock().unwrap().contains_key(&granularity)
    }
}

/// A fresh data directory plus the config pointing at it.
pub struct Fixture {
    pub dir: TempDir,
    pub config: SyncConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = SyncConfig::default().with_data_dir(Some(dir.path().to_path_buf()));
        Self { dir, config }
    }

    pub fn store(&self) -> CsvSeriesStore {
        CsvSeriesStore::new(self.dir.path(), self.config.file_prefix.clone())
    }

    pub fn sync(&self, provider: ScriptedProvider) -> SeriesSync<ScriptedProvider, CsvSeriesStore> {
        SeriesSync::new(provider, self.store(), self.config.clone())
    }

    pub fn path(&self, granularity: Granularity) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}_{}.csv", self.config.file_prefix, granularity))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.path().join("data_summary.txt")
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
}

pub fn minute_ts(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 10, 0, 0).unwrap() + Duration::minutes(offset)
}

pub fn day_ts(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::days(offset)
}

pub fn bar(ts: DateTime<Utc>, close: f64) -> Bar {
    Bar::new(ts, close - 1.0, close + 2.0, close - 3.0, close, 1.5)
}

pub fn minute_bars(offsets: impl IntoIterator<Item = i64>) -> Vec<Bar> {
    offsets
        .into_iter()
        .map(|i| bar(minute_ts(i), 60_000.0 + i as f64))
        .collect()
}

pub fn daily_bars(offsets: impl IntoIterator<Item = i64>) -> Vec<Bar> {
    offsets
        .into_iter()
        .map(|i| bar(day_ts(i), 60_000.0 + 100.0 * i as f64))
        .collect()
}
