/// Per-file extraction: read one log, run both scanners, and assemble a
/// `FileResult`.
use crate::config::{BuildPolicy, ExtractConfig};
use crate::duration::{self, format_duration};
use crate::scan::timestamps::{starts_with_marker, TimestampRecord, TimestampScanner};
use crate::scan::tokens::{scan_token_usage, TokenUsage};
use crate::scan::read_lines;
use crate::table::{write_csv_atomic, CsvError};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Fail,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything extracted from one log file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub prompt_id: Option<i64>,
    pub log_file: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub build_status: BuildStatus,
    /// `None` when the file had no usable timestamps.
    pub post_build_error: Option<bool>,
    pub provider_usage: TokenUsage,
    pub total_api_calls: u64,
}

/// Extract a `FileResult` from a log file.
///
/// Never fails: an unreadable file is logged and treated as empty.
pub fn extract_single_file(path: &Path, config: &ExtractConfig) -> FileResult {
    let lines = read_lines_or_empty(path);
    extract_from_lines(&file_name(path), &lines, config)
}

/// Extract a `FileResult` from already-read lines.
pub fn extract_from_lines(log_file: &str, lines: &[String], config: &ExtractConfig) -> FileResult {
    let scan = TimestampScanner::new(&config.markers).scan(lines);
    let provider_usage = scan_token_usage(lines);
    let total_api_calls = provider_usage.total_api_calls();
    let prompt_id = prompt_id_from_filename(log_file);

    let post_build_error = scan.post_build_error();
    let records = trim_teardown(scan.records, &config.markers.teardown);

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        tracing::debug!(log_file, "no timestamps found");
        return FileResult {
            prompt_id,
            log_file: log_file.to_string(),
            start_time: None,
            end_time: None,
            duration: None,
            build_status: BuildStatus::Fail,
            post_build_error: None,
            provider_usage,
            total_api_calls,
        };
    };

    let succeeded = match config.build.policy {
        BuildPolicy::DeployFlag => scan.deployed && !post_build_error,
        BuildPolicy::LastLine => starts_with_marker(&last.full_line, &config.markers.deploy_prefix),
    };

    FileResult {
        prompt_id,
        log_file: log_file.to_string(),
        start_time: Some(first.timestamp.clone()),
        end_time: Some(last.timestamp.clone()),
        duration: format_duration(&first.timestamp, &last.timestamp),
        build_status: if succeeded {
            BuildStatus::Success
        } else {
            BuildStatus::Fail
        },
        post_build_error: Some(post_build_error),
        provider_usage,
        total_api_calls,
    }
}

/// Drop the final record if it is a container-teardown line.
fn trim_teardown(mut records: Vec<TimestampRecord>, teardown: &str) -> Vec<TimestampRecord> {
    if !teardown.is_empty()
        && records
            .last()
            .is_some_and(|r| r.full_line.contains(teardown))
    {
        records.pop();
    }
    records
}

/// Prompt id from a name like `prompt_7.log`: the second `_`-separated token
/// of the stem, as an integer.
pub fn prompt_id_from_filename(file_name: &str) -> Option<i64> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let id = stem.split('_').nth(1)?.parse().ok();
    if id.is_none() {
        tracing::debug!(file_name, "no prompt id in file name");
    }
    id
}

fn read_lines_or_empty(path: &Path) -> Vec<String> {
    match read_lines(path) {
        Ok(lines) => lines,
        Err(e) if e.is_not_found() => {
            tracing::warn!(path = %path.display(), "log file not found, treating as empty");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "log unreadable, treating as empty");
            Vec::new()
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write every timestamped line of a log to `<stem>_extracted.csv` in
/// `dest_dir` (or to `output` when given).
///
/// Returns `Ok(None)` when the file has no timestamps; nothing is written.
pub fn export_timestamps(
    path: &Path,
    output: Option<&Path>,
    dest_dir: &Path,
    config: &ExtractConfig,
) -> Result<Option<PathBuf>, CsvError> {
    let lines = read_lines_or_empty(path);
    let scan = TimestampScanner::new(&config.markers).scan(&lines);
    if scan.records.is_empty() {
        tracing::info!(path = %path.display(), "no data to save");
        return Ok(None);
    }

    let out_path = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "log".to_string());
            dest_dir.join(format!("{stem}_extracted.csv"))
        }
    };

    let header = ["timestamp", "line_number", "full_line", "datetime"];
    let rows = scan.records.iter().map(|r| {
        let datetime = duration::parse_timestamp(&r.timestamp)
            .map(|dt| dt.format(duration::TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        vec![
            r.timestamp.clone(),
            r.line_number.to_string(),
            r.full_line.clone(),
            datetime,
        ]
    });
    write_csv_atomic(&out_path, &header[..], rows)?;

    tracing::info!(path = %out_path.display(), rows = scan.records.len(), "timestamps saved");
    Ok(Some(out_path))
}
