/// Elapsed wall-clock time between two log timestamps.
use chrono::NaiveDateTime;

/// Format of every timestamp the scanner records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, DurationError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| DurationError::Parse {
        value: value.to_string(),
        source: e,
    })
}

/// Whole seconds between two timestamps. Negative when the end precedes the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    seconds: i64,
}

impl Elapsed {
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

/// Renders as `<minutes>min <seconds:02>sec`, e.g. `5min 03sec`.
///
/// Negative spans keep their sign on the magnitude: -65s is `-1min 05sec`.
impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds < 0 { "-" } else { "" };
        let abs = self.seconds.unsigned_abs();
        write!(f, "{sign}{}min {:02}sec", abs / 60, abs % 60)
    }
}

/// Compute `end - start`.
pub fn elapsed_between(start: &str, end: &str) -> Result<Elapsed, DurationError> {
    let start_dt = parse_timestamp(start)?;
    let end_dt = parse_timestamp(end)?;
    Ok(Elapsed::from_seconds((end_dt - start_dt).num_seconds()))
}

/// Rendered duration, or `None` (with a warning) if either side fails to parse.
pub fn format_duration(start: &str, end: &str) -> Option<String> {
    match elapsed_between(start, end) {
        Ok(elapsed) => {
            if elapsed.seconds() < 0 {
                tracing::warn!(start, end, "end timestamp precedes start timestamp");
            }
            Some(elapsed.to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not calculate duration");
            None
        }
    }
}

#[derive(Debug)]
pub enum DurationError {
    Parse {
        value: String,
        source: chrono::ParseError,
    },
}

impl std::fmt::Display for DurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationError::Parse { value, source } => {
                write!(f, "invalid timestamp {value:?}: {source}")
            }
        }
    }
}

impl std::error::Error for DurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DurationError::Parse { source, .. } => Some(source),
        }
    }
}
