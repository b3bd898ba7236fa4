//! Line-oriented scanners over a log file's text.
//!
//! Both scanners consume the same `&[String]` so a file is read once per
//! extraction pass.

pub mod timestamps;
pub mod tokens;

use std::io::Read;
use std::path::{Path, PathBuf};

/// A raw log line with its 1-based position in the file.
#[derive(Debug, Clone, Copy)]
pub struct LogLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Iterate lines paired with their 1-based line numbers.
pub fn numbered(lines: &[String]) -> impl Iterator<Item = LogLine<'_>> {
    lines.iter().enumerate().map(|(i, text)| LogLine {
        number: i + 1,
        text: text.as_str(),
    })
}

/// Read every line of a log file.
///
/// Lines end at `\n`, `\r\n` or a lone `\r` (progress output rewrites its
/// line with a bare carriage return). The whole file must decode as UTF-8;
/// a decode failure anywhere fails the read rather than returning a
/// truncated prefix.
pub fn read_lines(path: &Path) -> Result<Vec<String>, ReadError> {
    let file = std::fs::File::open(path).map_err(|e| ReadError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| ReadError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(split_lines(&text))
}

/// Split text on `\n`, `\r\n` and lone `\r`. A trailing terminator does not
/// produce an empty final line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find(|c: char| c == '\r' || c == '\n') {
        lines.push(rest[..idx].to_string());
        let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[idx + skip..];
    }
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }
    lines
}

/// Errors from reading a log file.
#[derive(Debug)]
pub enum ReadError {
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    Decode {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ReadError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReadError::Open { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Open { path, source } => {
                write!(f, "failed to open {}: {source}", path.display())
            }
            ReadError::Decode { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Open { source, .. } => Some(source),
            ReadError::Decode { source, .. } => Some(source),
        }
    }
}
