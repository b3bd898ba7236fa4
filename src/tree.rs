/// Tree summaries: one folder summary per config subfolder, concatenated
/// and tagged with the subfolder name.
use crate::config::ExtractConfig;
use crate::folder::{aggregate_folder, SummaryError};
use crate::table::SummaryTable;
use std::path::{Path, PathBuf};

/// Summarize every immediate subfolder of `root`.
///
/// Each subfolder gets its own `<name>_summary.csv` (in `dest` if given,
/// otherwise inside the subfolder). Rows come back in subfolder name
/// order, then file name order, with `config` set to the subfolder name.
pub fn aggregate_tree(root: &Path, dest: Option<&Path>, config: &ExtractConfig) -> SummaryTable {
    let folders = match config_folders(root) {
        Ok(folders) => folders,
        Err(e) => {
            tracing::warn!(error = %e, "skipping tree");
            return SummaryTable::new();
        }
    };

    let mut combined = SummaryTable::new();
    for folder in folders {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(config = %name, folder = %folder.display(), "processing config folder");

        let mut table = aggregate_folder(&folder, dest, config);
        if table.is_empty() {
            tracing::debug!(config = %name, "no rows, skipping");
            continue;
        }
        table.tag_config(&name);
        combined.append(table);
    }

    tracing::info!(rows = combined.len(), root = %root.display(), "tree summary complete");
    combined
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn config_folders(root: &Path) -> Result<Vec<PathBuf>, SummaryError> {
    if !root.exists() {
        return Err(SummaryError::NotFound(root.to_path_buf()));
    }
    let entries = std::fs::read_dir(root).map_err(|e| SummaryError::ReadDir {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut folders: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(folders)
}
