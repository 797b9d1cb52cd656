//! Sync configuration: TOML parsing, per-granularity defaults, and environment overrides.
//!
//! Every key is optional. A missing file section falls back to the defaults
//! below, and a missing key inside a `[minute]` or `[daily]` section falls
//! back to that granularity's own default rather than a shared one.
//!
//! ```toml
//! data_dir = "data"
//! symbol = "BTC-USD"
//! file_prefix = "BTCUSD"
//!
//! [provider]
//! requests_per_minute = 30
//!
//! [minute]
//! lookback_days = 3
//! overlap_minutes = 5
//! ```
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_config_str`]
//! - Parse + validate from a file path: [`load_config_path`]
//! - Apply `SERIES_SYNC_DATA_DIR`: [`SyncConfig::apply_env`]

use std::{
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use chrono::Duration;
use market_data_ingestor::{
    models::granularity::Granularity,
    providers::{
        chunked::ChunkPolicy,
        yahoo_chart::{
            YahooChartConfig,
            provider::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT},
        },
    },
};
use serde::{Deserialize, Serialize};
use shared_utils::env::env_path_override;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SERIES_SYNC_CONFIG";
/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "SERIES_SYNC_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SyncConfig {
    /// Directory holding the series files and the report.
    pub data_dir: PathBuf,
    /// Symbol as the provider spells it.
    pub symbol: String,
    /// Series files are named `{file_prefix}_{granularity}.csv`.
    pub file_prefix: String,
    /// Report path. Relative paths resolve against `data_dir`.
    pub report_file: PathBuf,
    pub provider: ProviderCfg,
    pub minute: GranularityCfg,
    pub daily: GranularityCfg,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            symbol: "BTC-USD".to_string(),
            file_prefix: "BTCUSD".to_string(),
            report_file: PathBuf::from("data_summary.txt"),
            provider: ProviderCfg::default(),
            minute: GranularityCfg::default(),
            daily: GranularityCfg::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProviderCfg {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl Default for ProviderCfg {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            requests_per_minute: 60,
        }
    }
}

/// Raw `[minute]` / `[daily]` section. Unset keys take the granularity's default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct GranularityCfg {
    pub enabled: Option<bool>,
    /// History fetched when the series is still empty.
    pub lookback_days: Option<u32>,
    /// How far back the provider serves bars at all.
    pub max_history_days: Option<u32>,
    /// Longest span requested in one upstream call.
    pub chunk_days: Option<u32>,
    /// Re-fetch this much before the last stored bar so trailing revisions land.
    pub overlap_minutes: Option<u32>,
}

/// Resolved settings for one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GranularityPolicy {
    pub enabled: bool,
    pub lookback: Duration,
    /// `None` when the provider has no history horizon.
    pub max_history: Option<Duration>,
    pub chunk: Duration,
    pub overlap: Duration,
}

impl GranularityPolicy {
    /// Built-in defaults before any config section is applied.
    pub fn default_for(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Minute => Self {
                enabled: true,
                lookback: Duration::days(7),
                max_history: Some(Duration::days(29)),
                chunk: Duration::days(7),
                overlap: Duration::zero(),
            },
            Granularity::Daily => Self {
                enabled: true,
                lookback: Duration::days(30),
                max_history: None,
                chunk: Duration::days(365),
                overlap: Duration::zero(),
            },
        }
    }
}

impl SyncConfig {
    pub fn section(&self, granularity: Granularity) -> &GranularityCfg {
        match granularity {
            Granularity::Minute => &self.minute,
            Granularity::Daily => &self.daily,
        }
    }

    /// Merges the section for `granularity` over its built-in defaults.
    pub fn policy(&self, granularity: Granularity) -> GranularityPolicy {
        let base = GranularityPolicy::default_for(granularity);
        let cfg = self.section(granularity);
        GranularityPolicy {
            enabled: cfg.enabled.unwrap_or(base.enabled),
            lookback: cfg
                .lookback_days
                .map(|d| Duration::days(d.into()))
                .unwrap_or(base.lookback),
            max_history: cfg
                .max_history_days
                .map(|d| Duration::days(d.into()))
                .or(base.max_history),
            chunk: cfg
                .chunk_days
                .map(|d| Duration::days(d.into()))
                .unwrap_or(base.chunk),
            overlap: cfg
                .overlap_minutes
                .map(|m| Duration::minutes(m.into()))
                .unwrap_or(base.overlap),
        }
    }

    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy {
            minute: self.policy(Granularity::Minute).chunk,
            daily: self.policy(Granularity::Daily).chunk,
        }
    }

    pub fn provider_config(&self) -> YahooChartConfig {
        YahooChartConfig {
            base_url: self.provider.base_url.trim_end_matches('/').to_string(),
            user_agent: self.provider.user_agent.clone(),
            timeout: StdDuration::from_secs(self.provider.timeout_secs),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        if self.report_file.is_absolute() {
            self.report_file.clone()
        } else {
            self.data_dir.join(&self.report_file)
        }
    }

    /// Replaces `data_dir` when `dir` is set.
    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    /// Applies the `SERIES_SYNC_DATA_DIR` override from the process environment.
    pub fn apply_env(self) -> Self {
        self.with_data_dir(env_path_override(DATA_DIR_ENV))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("file_prefix must not be empty".into()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".into()));
        }
        if self.provider.requests_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "provider.requests_per_minute must be > 0".into(),
            ));
        }
        for g in Granularity::ALL {
            let cfg = self.section(g);
            for (key, value) in [
                ("lookback_days", cfg.lookback_days),
                ("max_history_days", cfg.max_history_days),
                ("chunk_days", cfg.chunk_days),
            ] {
                if value == Some(0) {
                    return Err(ConfigError::Invalid(format!("{g}.{key} must be > 0")));
                }
            }
        }
        Ok(())
    }
}

/// Parses and validates a TOML document.
pub fn load_config_str(s: &str) -> Result<SyncConfig, ConfigError> {
    let cfg: SyncConfig = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Reads, parses and validates the file at `path`.
pub fn load_config_path(path: &Path) -> Result<SyncConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_str(&s)
}
