use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use market_data_ingestor::{
    io::csv_store::CsvSeriesStore,
    models::granularity::Granularity,
    providers::{chunked::ChunkedProvider, yahoo_chart::YahooChartProvider},
};
use series_sync::{
    config::{CONFIG_PATH_ENV, SyncConfig, load_config_path},
    logging::init_tracing,
    report::SectionStatus,
    sync::{GranularityOutcome, SeriesSync},
};
use shared_utils::env::env_path_override;
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "Incremental minute/daily history sync")]
struct Cli {
    /// Path to the TOML config. Falls back to $SERIES_SYNC_CONFIG, then built-in defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from the config and $SERIES_SYNC_DATA_DIR.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one update cycle over every enabled granularity.
    Run,
    /// Fetch and merge the last N days of one granularity.
    Backfill {
        /// minute | daily
        #[arg(long)]
        granularity: Granularity,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
    },
    /// Rebuild the summary report from the stored files only.
    Summary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let path = cli.config.clone().or_else(|| env_path_override(CONFIG_PATH_ENV));
    let config = match path {
        Some(path) => load_config_path(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SyncConfig::default(),
    };
    Ok(config.apply_env().with_data_dir(cli.data_dir.clone()))
}

/// Returns whether everything the command attempted succeeded.
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;
    info!(
        symbol = %config.symbol,
        data_dir = %config.data_dir.display(),
        "series-sync starting"
    );

    let provider = ChunkedProvider::new(
        YahooChartProvider::new(config.provider_config()).context("building quote provider")?,
        config.chunk_policy(),
    )
    .with_rate_limit(config.provider.requests_per_minute)
    .context("configuring request pacing")?;
    let store = CsvSeriesStore::new(config.data_dir.clone(), config.file_prefix.clone());
    let sync = SeriesSync::new(provider, store, config);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    match cli.cmd {
        Cmd::Run => {
            let report = rt.block_on(sync.run_cycle(Utc::now()));
            for (g, outcome) in &report.outcomes {
                if let GranularityOutcome::Synced(stats) = outcome {
                    info!(
                        granularity = %g,
                        records = stats.records,
                        added = stats.merge.added,
                        revised = stats.merge.revised,
                        "cycle complete"
                    );
                }
            }
            if let Err(e) = &report.report {
                error!(error = %e, "report not written");
            }
            Ok(report.is_success())
        }
        Cmd::Backfill { granularity, days } => {
            let now = Utc::now();
            let result = rt.block_on(sync.backfill(granularity, days, now));
            let ok = match &result {
                Ok(stats) => {
                    info!(
                        granularity = %granularity,
                        fetched = stats.fetched,
                        added = stats.merge.added,
                        records = stats.records,
                        "backfill complete"
                    );
                    true
                }
                Err(e) => {
                    error!(granularity = %granularity, error = %e, "backfill failed");
                    false
                }
            };
            let sections = sync.summarize_stored();
            sync.write_report(&sections, now)?;
            Ok(ok)
        }
        Cmd::Summary => {
            let sections = sync.summarize_stored();
            let path = sync.write_report(&sections, Utc::now())?;
            println!("{}", path.display());
            Ok(!sections
                .iter()
                .any(|s| matches!(s.status, SectionStatus::Failed(_))))
        }
    }
}
