/// Folder summaries: every log file in one folder, one CSV.
use crate::config::ExtractConfig;
use crate::extract::extract_single_file;
use crate::table::{CsvError, SummaryTable};
use std::path::{Path, PathBuf};

/// Summarize all log files directly inside `source`.
///
/// Writes `<source-name>_summary.csv` into `dest` (default: `source`). A
/// missing or log-free folder yields an empty table and no file. The table
/// is returned even when the CSV could not be written.
pub fn aggregate_folder(source: &Path, dest: Option<&Path>, config: &ExtractConfig) -> SummaryTable {
    let log_files = match find_log_files(source, &config.input.extension) {
        Ok(files) => files,
        Err(e @ SummaryError::NoLogFiles(_)) => {
            tracing::info!("{e}");
            return SummaryTable::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "skipping folder");
            return SummaryTable::new();
        }
    };
    tracing::info!(
        folder = %source.display(),
        count = log_files.len(),
        "found log files"
    );

    let results = log_files
        .iter()
        .map(|path| {
            tracing::debug!(file = %path.display(), "processing log");
            extract_single_file(path, config)
        })
        .collect();
    let table = SummaryTable::from_results(results);

    let dest = dest.unwrap_or(source);
    match write_summary(&table, source, dest) {
        Ok(path) => tracing::info!(
            path = %path.display(),
            rows = table.len(),
            "summary saved"
        ),
        Err(e) => tracing::warn!(error = %e, "failed to write folder summary"),
    }
    table
}

/// Log files directly inside `source`, sorted by name.
pub fn find_log_files(source: &Path, extension: &str) -> Result<Vec<PathBuf>, SummaryError> {
    if !source.exists() {
        return Err(SummaryError::NotFound(source.to_path_buf()));
    }

    let escaped = glob::Pattern::escape(&source.to_string_lossy());
    let pattern = format!("{escaped}/*.{}", glob::Pattern::escape(extension));

    let mut files: Vec<PathBuf> = Vec::new();
    // Hidden files such as `.prompt_1.log` are not logs of a run.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    for entry in glob::glob_with(&pattern, options).map_err(SummaryError::Pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
        }
    }

    if files.is_empty() {
        return Err(SummaryError::NoLogFiles(source.to_path_buf()));
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `<folder-name>_summary.csv` for a source folder.
pub fn summary_file_name(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            // `.` or `..` have no file name of their own
            source
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "logs".to_string());
    format!("{name}_summary.csv")
}

fn write_summary(table: &SummaryTable, source: &Path, dest: &Path) -> Result<PathBuf, SummaryError> {
    std::fs::create_dir_all(dest).map_err(|e| SummaryError::CreateDir {
        path: dest.to_path_buf(),
        source: e,
    })?;
    let path = dest.join(summary_file_name(source));
    table.write_csv(&path).map_err(SummaryError::Csv)?;
    Ok(path)
}

/// Errors from locating inputs or writing a summary.
#[derive(Debug)]
pub enum SummaryError {
    NotFound(PathBuf),
    NoLogFiles(PathBuf),
    Pattern(glob::PatternError),
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv(CsvError),
}

impl std::fmt::Display for SummaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryError::NotFound(path) => {
                write!(f, "source {} does not exist", path.display())
            }
            SummaryError::NoLogFiles(path) => {
                write!(f, "no log files found in {}", path.display())
            }
            SummaryError::Pattern(e) => write!(f, "invalid log file pattern: {e}"),
            SummaryError::ReadDir { path, source } => {
                write!(f, "failed to list {}: {source}", path.display())
            }
            SummaryError::CreateDir { path, source } => {
                write!(f, "failed to create {}: {source}", path.display())
            }
            SummaryError::Csv(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SummaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SummaryError::Pattern(e) => Some(e),
            SummaryError::ReadDir { source, .. } => Some(source),
            SummaryError::CreateDir { source, .. } => Some(source),
            SummaryError::Csv(e) => Some(e),
            SummaryError::NotFound(_) | SummaryError::NoLogFiles(_) => None,
        }
    }
}
