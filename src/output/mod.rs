mod cli;
mod html;
mod json;

pub use cli::print_cli_table;
pub use html::{generate_html_string, print_html};
pub use json::{generate_json_string, print_json};

use crate::model::ScanResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;
use walkdir::WalkDir;

/// Prefix of every report file name.
pub const REPORT_PREFIX: &str = "cybervault-report-";

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
    /// HTML report document
    Html,
}

impl OutputFormat {
    /// File extension used when the format is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json | OutputFormat::Table => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!(
                "Unknown format: {}. Use 'table', 'json', or 'html'",
                s
            )),
        }
    }
}

pub fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result),
        OutputFormat::Json => print_json(result),
        OutputFormat::Html => print_html(result),
    }
}

/// Format result to string for file output
pub fn format_result_to_string(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Html => Ok(generate_html_string(result)),
        // Tables are written to disk as JSON
        OutputFormat::Json | OutputFormat::Table => generate_json_string(result),
    }
}

/// File name of the report for a scan, e.g. `cybervault-report-20231026_123000.html`.
pub fn report_file_name(result: &ScanResult, format: OutputFormat) -> String {
    format!("{}{}.{}", REPORT_PREFIX, result.timestamp, format.extension())
}

/// Writes the report document into `dir` and returns its path.
pub fn write_report(result: &ScanResult, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    crate::platform::ensure_dir(dir)
        .with_context(|| format!("Failed to create reports directory {}", dir.display()))?;

    let path = dir.join(report_file_name(result, format));
    let content = format_result_to_string(result, format)?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    info!("Report written to {}", path.display());
    Ok(path)
}

/// A report previously written to the reports directory.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Lists report files in `dir`, newest first. A missing directory has no reports.
pub fn list_reports(dir: &Path) -> Result<Vec<ReportFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() || !is_report_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let metadata = entry.metadata()?;
        reports.push(ReportFile {
            path: entry.into_path(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        });
    }

    // Timestamps in the names sort chronologically; mtime breaks ties.
    reports.sort_by(|a, b| {
        b.path
            .file_name()
            .cmp(&a.path.file_name())
            .then(b.modified.cmp(&a.modified))
    });
    Ok(reports)
}

fn is_report_name(name: &str) -> bool {
    name.starts_with(REPORT_PREFIX) && (name.ends_with(".html") || name.ends_with(".json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn result_at(h: u32) -> ScanResult {
        let time = Local.with_ymd_and_hms(2023, 10, 26, h, 30, 0).unwrap();
        ScanResult::at(time, vec![], vec![], false)
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_report_file_name() {
        let result = result_at(12);
        assert_eq!(
            report_file_name(&result, OutputFormat::Html),
            "cybervault-report-20231026_123000.html"
        );
        assert_eq!(
            report_file_name(&result, OutputFormat::Table),
            "cybervault-report-20231026_123000.json"
        );
    }

    #[test]
    fn test_write_and_list_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports");

        assert!(list_reports(&dir).unwrap().is_empty());

        let older = write_report(&result_at(9), &dir, OutputFormat::Json).unwrap();
        let newer = write_report(&result_at(14), &dir, OutputFormat::Html).unwrap();
        fs::write(dir.join("notes.txt"), "not a report").unwrap();

        let reports = list_reports(&dir).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].path, newer);
        assert_eq!(reports[1].path, older);
        assert!(reports[0].size > 0);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&older).unwrap()).unwrap();
        assert_eq!(json["timestamp"], "20231026_093000");
    }
}
