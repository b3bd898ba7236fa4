//! Summary tables: one row per log file, provider usage flattened into
//! `<provider>_<metric>` columns, written as CSV.

use crate::extract::FileResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Columns present in every summary, in order.
pub const SCALAR_COLUMNS: [&str; 7] = [
    "prompt_id",
    "log_file",
    "start_time",
    "end_time",
    "gen_time",
    "build_status",
    "post_build_error",
];

/// A file's result, plus the config folder it came from in tree summaries.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub result: FileResult,
    pub config: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

/// Column prefix for a provider: lowercased, spaces replaced by underscores.
pub fn provider_column_prefix(provider: &str) -> String {
    provider.to_lowercase().replace(' ', "_")
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: Vec<FileResult>) -> Self {
        Self {
            rows: results
                .into_iter()
                .map(|result| SummaryRow {
                    result,
                    config: None,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// Set the `config` column of every row. A no-op on an empty table.
    pub fn tag_config(&mut self, config: &str) {
        for row in &mut self.rows {
            row.config = Some(config.to_string());
        }
    }

    /// Append another table's rows after this table's rows.
    pub fn append(&mut self, other: SummaryTable) {
        self.rows.extend(other.rows);
    }

    fn has_config(&self) -> bool {
        self.rows.iter().any(|r| r.config.is_some())
    }

    /// Flattened provider columns, in first-seen order across all rows.
    fn provider_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for entry in row.result.provider_usage.iter() {
                let prefix = provider_column_prefix(&entry.provider);
                for (metric, _) in entry.usage.metrics() {
                    let column = format!("{prefix}_{metric}");
                    if !columns.contains(&column) {
                        columns.push(column);
                    }
                }
            }
        }
        columns
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = SCALAR_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(self.provider_columns());
        header.push("total_api_calls".to_string());
        if self.has_config() {
            header.push("config".to_string());
        }
        header
    }

    /// Rendered cells, one `Vec` per row, aligned with `header()`.
    pub fn records(&self) -> Vec<Vec<String>> {
        let provider_columns = self.provider_columns();
        let has_config = self.has_config();
        self.rows
            .iter()
            .map(|row| render_row(row, &provider_columns, has_config))
            .collect()
    }

    /// Rendered value of `column` in row `index`, if both exist.
    #[cfg(test)]
    pub fn cell(&self, index: usize, column: &str) -> Option<String> {
        let col = self.header().iter().position(|h| h == column)?;
        self.records().into_iter().nth(index)?.into_iter().nth(col)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), CsvError> {
        write_csv_atomic(path, &self.header()[..], self.records())
    }
}

fn render_row(row: &SummaryRow, provider_columns: &[String], has_config: bool) -> Vec<String> {
    let r = &row.result;
    let mut cells = vec![
        r.prompt_id.map(|id| id.to_string()).unwrap_or_default(),
        r.log_file.clone(),
        r.start_time.clone().unwrap_or_default(),
        r.end_time.clone().unwrap_or_default(),
        r.duration.clone().unwrap_or_default(),
        r.build_status.to_string(),
        r.post_build_error.map(render_bool).unwrap_or_default(),
    ];

    // Providers differing only in case or spacing share a column; their values add up.
    let mut flattened: HashMap<String, u64> = HashMap::new();
    for entry in r.provider_usage.iter() {
        let prefix = provider_column_prefix(&entry.provider);
        for (metric, value) in entry.usage.metrics() {
            *flattened.entry(format!("{prefix}_{metric}")).or_default() += value;
        }
    }
    cells.extend(
        provider_columns
            .iter()
            .map(|c| flattened.get(c).map(|v| v.to_string()).unwrap_or_default()),
    );

    cells.push(r.total_api_calls.to_string());
    if has_config {
        cells.push(row.config.clone().unwrap_or_default());
    }
    cells
}

fn render_bool(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// Write a CSV file via a temp file in the same directory and a rename, so
/// readers never see a partial table. The file gets the usual umask-derived
/// permissions.
pub fn write_csv_atomic<H, R>(path: &Path, header: &[H], rows: R) -> Result<(), CsvError>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "summary.csv".to_string());
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    let result = write_csv_file(&tmp_path, header, rows).and_then(|()| {
        std::fs::rename(&tmp_path, path).map_err(|e| CsvError::Rename {
            from: tmp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn write_csv_file<H, R>(path: &Path, header: &[H], rows: R) -> Result<(), CsvError>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let file = std::fs::File::create(path).map_err(|e| CsvError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;

    let write_err = |e: csv::Error| CsvError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(header.iter().map(|h| h.as_ref()))
        .map_err(write_err)?;
    for row in rows {
        writer.write_record(&row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| CsvError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Errors from writing a CSV file.
#[derive(Debug)]
pub enum CsvError {
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    Write {
        path: PathBuf,
        source: csv::Error,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvError::Create { path, source } => {
                write!(f, "failed to write temp file {}: {source}", path.display())
            }
            CsvError::Write { path, source } => {
                write!(f, "failed to write csv {}: {source}", path.display())
            }
            CsvError::Rename { from, to, source } => {
                write!(
                    f,
                    "failed to rename {} -> {}: {source}",
                    from.display(),
                    to.display()
                )
            }
        }
    }
}

impl std::error::Error for CsvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CsvError::Create { source, .. } => Some(source),
            CsvError::Write { source, .. } => Some(source),
            CsvError::Rename { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::extract::extract_from_lines;
    use tempfile::TempDir;

    fn result(name: &str, raw: &[&str]) -> FileResult {
        let lines: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
        extract_from_lines(name, &lines, &ExtractConfig::default())
    }

    const ANTHROPIC: &str = "Provider: Anthropic | Model: claude-3 | Input tokens: 100 | Output tokens: 50 | Total tokens: 150";
    const OPEN_AI: &str = "Provider: Open AI | Model: gpt-4o | Input tokens: 7 | Output tokens: 3 | Total tokens: 10";

    #[test]
    fn flattens_provider_usage() {
        let table = SummaryTable::from_results(vec![result(
            "prompt_1.log",
            &["2025-07-15 21:09:00 start", ANTHROPIC, ANTHROPIC],
        )]);
        assert_eq!(table.cell(0, "anthropic_input_tokens").as_deref(), Some("200"));
        assert_eq!(table.cell(0, "anthropic_api_calls").as_deref(), Some("2"));
        assert_eq!(table.cell(0, "total_api_calls").as_deref(), Some("2"));
    }

    #[test]
    fn header_order_and_union_of_providers() {
        let table = SummaryTable::from_results(vec![
            result("prompt_1.log", &[ANTHROPIC]),
            result("prompt_2.log", &[OPEN_AI, ANTHROPIC]),
        ]);
        let header = table.header();
        assert_eq!(&header[..7], &SCALAR_COLUMNS.map(String::from)[..]);
        assert_eq!(
            &header[7..],
            &[
                "anthropic_input_tokens",
                "anthropic_output_tokens",
                "anthropic_total_tokens",
                "anthropic_api_calls",
                "open_ai_input_tokens",
                "open_ai_output_tokens",
                "open_ai_total_tokens",
                "open_ai_api_calls",
                "total_api_calls",
            ]
        );
        // first row never saw Open AI
        assert_eq!(table.cell(0, "open_ai_api_calls").as_deref(), Some(""));
        assert_eq!(table.cell(1, "open_ai_total_tokens").as_deref(), Some("10"));
    }

    #[test]
    fn case_variants_share_a_column() {
        let table = SummaryTable::from_results(vec![result(
            "prompt_1.log",
            &[
                ANTHROPIC,
                "Provider: anthropic | Model: claude-3 | Input tokens: 1 | Output tokens: 1 | Total tokens: 2",
            ],
        )]);
        assert_eq!(table.rows()[0].result.provider_usage.len(), 2);
        assert_eq!(table.cell(0, "anthropic_input_tokens").as_deref(), Some("101"));
        assert_eq!(table.cell(0, "anthropic_api_calls").as_deref(), Some("2"));
        assert_eq!(table.cell(0, "total_api_calls").as_deref(), Some("2"));
    }

    #[test]
    fn null_fields_render_empty() {
        let table = SummaryTable::from_results(vec![result("summary.log", &["nothing"])]);
        assert_eq!(table.cell(0, "prompt_id").as_deref(), Some(""));
        assert_eq!(table.cell(0, "start_time").as_deref(), Some(""));
        assert_eq!(table.cell(0, "gen_time").as_deref(), Some(""));
        assert_eq!(table.cell(0, "post_build_error").as_deref(), Some(""));
        assert_eq!(table.cell(0, "build_status").as_deref(), Some("fail"));
        assert_eq!(table.cell(0, "total_api_calls").as_deref(), Some("0"));
    }

    #[test]
    fn booleans_render_capitalized() {
        let table = SummaryTable::from_results(vec![result(
            "prompt_1.log",
            &["2025-07-15 21:09:00 start"],
        )]);
        assert_eq!(table.cell(0, "post_build_error").as_deref(), Some("False"));
    }

    #[test]
    fn config_column_only_when_tagged() {
        let mut table = SummaryTable::from_results(vec![result("prompt_1.log", &[])]);
        assert!(!table.header().contains(&"config".to_string()));
        table.tag_config("baseline");
        assert_eq!(table.header().last().map(String::as_str), Some("config"));
        assert_eq!(table.cell(0, "config").as_deref(), Some("baseline"));
    }

    #[test]
    fn tagging_empty_table_is_noop() {
        let mut table = SummaryTable::new();
        table.tag_config("empty");
        assert!(table.is_empty());
        assert!(!table.header().contains(&"config".to_string()));
    }

    #[test]
    fn write_csv_round_trip_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let table = SummaryTable::from_results(vec![result(
            "prompt_7.log",
            &[
                "2025-07-15 21:09:00 ... start",
                ANTHROPIC,
                "2025-07-15 21:14:03 App is running on 8080",
            ],
        )]);
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "prompt_id,log_file,start_time,end_time,gen_time,build_status,post_build_error,\
             anthropic_input_tokens,anthropic_output_tokens,anthropic_total_tokens,anthropic_api_calls,total_api_calls"
        );
        assert_eq!(
            lines[1],
            "7,prompt_7.log,2025-07-15 21:09:00,2025-07-15 21:14:03,5min 03sec,success,False,100,50,150,1,1"
        );
        assert_eq!(lines.len(), 2);

        // no temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_csv_uses_default_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg_summary.csv");
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, "x").unwrap();
        SummaryTable::from_results(vec![result("prompt_1.log", &[])])
            .write_csv(&path)
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }

    #[test]
    fn write_csv_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = SummaryTable::new().write_csv(&path).unwrap_err();
        assert!(matches!(err, CsvError::Create { .. }));
    }
}
