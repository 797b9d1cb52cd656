//! CSV-backed [`SeriesStore`].
//!
//! One file per granularity, `<prefix>_<granularity>.csv`, with a header row
//! and a stable column order:
//!
//! ```text
//! timestamp,open,high,low,close,volume,returns,price_range,vwap
//! 2025-01-01T00:00:00Z,93425.1,93450,93400,93440.2,0,,50,
//! ```
//!
//! Timestamps are written as RFC-3339 UTC. On read, columns are matched by
//! name (case-insensitive) so files produced by older tooling with
//! capitalised headers, pandas-style `2025-01-01 00:00:00+00:00` timestamps
//! or epoch seconds still load. The derived columns are ignored on read and
//! recomputed on every write.
//!
//! Writes go to `<file>.csv.tmp`, are fsynced, then renamed over the target.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use snafu::ResultExt;
use tracing::debug;

use crate::io::store::{
    CorruptSnafu, IoSnafu, MissingColumnSnafu, SeriesStore, StoreError, WriteSnafu,
};
use crate::models::{
    bar::Bar, bar_series::BarSeries, derived::derive, granularity::Granularity,
};

/// Column order of every written file.
pub const COLUMNS: [&str; 9] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "returns",
    "price_range",
    "vwap",
];

/// Columns a file must carry to be loadable.
pub const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone)]
pub struct CsvSeriesStore {
    dir: PathBuf,
    prefix: String,
}

impl CsvSeriesStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, granularity: Granularity) -> String {
        format!("{}_{}.csv", self.prefix, granularity)
    }
}

impl SeriesStore for CsvSeriesStore {
    fn location(&self, granularity: Granularity) -> PathBuf {
        self.dir.join(self.file_name(granularity))
    }

    fn exists(&self, granularity: Granularity) -> bool {
        self.location(granularity).is_file()
    }

    fn load(&self, granularity: Granularity) -> Result<BarSeries, StoreError> {
        let path = self.location(granularity);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no series file yet");
                return Ok(BarSeries::empty(granularity));
            }
            Err(e) => return Err(e).context(IoSnafu { path: &path }),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = rdr
            .headers()
            .map_err(|e| corrupt(&path, format!("unreadable header: {e}")))?
            .clone();
        let idx = column_indices(&headers, &path)?;

        let mut bars = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| corrupt(&path, e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let field = |i: usize| record.get(i).unwrap_or_default();

            let timestamp = parse_timestamp(field(idx[0])).ok_or_else(|| {
                corrupt(
                    &path,
                    format!("line {line}: bad timestamp `{}`", field(idx[0])),
                )
            })?;
            let mut values = [0.0_f64; 5];
            for (slot, (col, i)) in values
                .iter_mut()
                .zip(REQUIRED_COLUMNS[1..].iter().zip(&idx[1..]))
            {
                *slot = field(*i).parse::<f64>().map_err(|_| {
                    corrupt(
                        &path,
                        format!("line {line}: bad value `{}` for `{col}`", field(*i)),
                    )
                })?;
            }
            let [open, high, low, close, volume] = values;
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        BarSeries::try_new(granularity, bars).map_err(|v| corrupt(&path, v.to_string()))
    }

    fn save(&self, series: &BarSeries) -> Result<PathBuf, StoreError> {
        let path = self.location(series.granularity());
        fs::create_dir_all(&self.dir).context(IoSnafu { path: &self.dir })?;

        let tmp = path.with_extension("csv.tmp");
        let mut file = File::create(&tmp).context(IoSnafu { path: &tmp })?;
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut file);
            wtr.write_record(COLUMNS).context(WriteSnafu { path: &tmp })?;

            let derived = derive(series.bars());
            for (bar, d) in series.bars().iter().zip(&derived) {
                wtr.write_record([
                    bar.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    bar.open.to_string(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.close.to_string(),
                    bar.volume.to_string(),
                    d.returns.map(|v| v.to_string()).unwrap_or_default(),
                    d.price_range.to_string(),
                    d.vwap.map(|v| v.to_string()).unwrap_or_default(),
                ])
                .context(WriteSnafu { path: &tmp })?;
            }
            wtr.flush().context(IoSnafu { path: &tmp })?;
        }
        file.flush().context(IoSnafu { path: &tmp })?;
        file.sync_all().context(IoSnafu { path: &tmp })?;
        drop(file);

        fs::rename(&tmp, &path).context(IoSnafu { path: &path })?;
        debug!(path = %path.display(), rows = series.len(), "series saved");
        Ok(path)
    }
}

fn corrupt(path: &Path, reason: String) -> StoreError {
    CorruptSnafu { path, reason }.build()
}

/// Positions of [`REQUIRED_COLUMNS`] in `headers`, in the same order.
fn column_indices(headers: &csv::StringRecord, path: &Path) -> Result<[usize; 6], StoreError> {
    let mut idx = [0usize; 6];
    for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| MissingColumnSnafu { path, column: name }.build())?;
    }
    Ok(idx)
}

/// Parses the timestamp spellings found in series files, always yielding UTC.
///
/// Accepted: RFC-3339 (`2025-01-01T00:00:00Z`), pandas-style
/// (`2025-01-01 00:00:00+00:00`), bare dates (`2025-01-01`, midnight UTC) and
/// epoch seconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    }
    None
}
