//! Plain-text summary report.
//!
//! The report is regenerated wholesale each cycle and is meant for humans;
//! nothing in this workspace parses it back.

use std::{
    fmt::Write as _,
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use market_data_ingestor::models::granularity::Granularity;

use crate::summary::Summary;

const RULE_WIDTH: usize = 50;
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// What the report says about one granularity.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionStatus {
    Summary(Summary),
    /// The series exists but holds no rows yet.
    Empty,
    /// The granularity's cycle failed; carries the reason shown to the operator.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub granularity: Granularity,
    pub file_name: String,
    pub status: SectionStatus,
}

pub fn render_report(symbol: &str, generated_at: DateTime<Utc>, sections: &[ReportSection]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report_text(&mut out, symbol, generated_at, sections);
    out
}

fn write_report_text(
    out: &mut String,
    symbol: &str,
    generated_at: DateTime<Utc>,
    sections: &[ReportSection],
) -> std::fmt::Result {
    writeln!(out, "{symbol} Historical Data Summary")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "Generated: {}", generated_at.format(TS_FORMAT))?;

    for section in sections {
        writeln!(out)?;
        writeln!(
            out,
            "{} DATA:",
            section.granularity.as_str().to_ascii_uppercase()
        )?;
        match &section.status {
            SectionStatus::Summary(s) => {
                writeln!(out, "  Records: {}", s.records)?;
                writeln!(
                    out,
                    "  Date Range: {} to {}",
                    s.first.format(TS_FORMAT),
                    s.last.format(TS_FORMAT)
                )?;
                writeln!(out, "  Price Range: ${:.2} - ${:.2}", s.min_close, s.max_close)?;
                writeln!(out, "  Average Price: ${:.2}", s.mean_close)?;
                match &s.largest_gap {
                    Some(g) => writeln!(
                        out,
                        "  Gaps: {} (largest: {} missing from {})",
                        s.gap_count,
                        g.missing,
                        g.first_missing(s.granularity).format(TS_FORMAT)
                    )?,
                    None => writeln!(out, "  Gaps: none")?,
                }
            }
            SectionStatus::Empty => writeln!(out, "  Records: 0")?,
            SectionStatus::Failed(reason) => writeln!(out, "  Update failed: {reason}")?,
        }
        writeln!(out, "  File: {}", section.file_name)?;
    }
    Ok(())
}

/// Replaces the report file through a temp file and rename.
pub fn write_report(path: &Path, text: &str) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("txt.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(path.to_path_buf())
}
