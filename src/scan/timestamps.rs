/// Timestamp and sentinel-line scanning.
///
/// Records the first `YYYY-MM-DD HH:MM:SS` substring of every line, and
/// raises file-wide flags for deploy, assertion-error and emoji-request lines.
use super::numbered;
use crate::config::MarkerConfig;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// ASCII digits only; `\d` would also accept other Unicode digits.
static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}").unwrap()
});

/// A line that carries a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampRecord {
    pub timestamp: String,
    pub line_number: usize,
    /// The line with surrounding whitespace trimmed.
    pub full_line: String,
}

/// Result of one scan pass over a file.
#[derive(Debug, Default)]
pub struct TimestampScan {
    /// In file line order.
    pub records: Vec<TimestampRecord>,
    pub deployed: bool,
    pub assertion_error: bool,
    pub emoji_message: bool,
}

impl TimestampScan {
    /// An assertion error in a run that received the emoji follow-up request.
    pub fn post_build_error(&self) -> bool {
        self.assertion_error && self.emoji_message
    }
}

pub struct TimestampScanner<'a> {
    markers: &'a MarkerConfig,
}

impl<'a> TimestampScanner<'a> {
    pub fn new(markers: &'a MarkerConfig) -> Self {
        Self { markers }
    }

    pub fn scan(&self, lines: &[String]) -> TimestampScan {
        let mut scan = TimestampScan::default();

        for line in numbered(lines) {
            let trimmed = line.text.trim();

            if starts_with_marker(trimmed, &self.markers.assertion_prefix) {
                scan.assertion_error = true;
            } else if starts_with_marker(trimmed, &self.markers.deploy_prefix) {
                scan.deployed = true;
            }
            if !self.markers.emoji_request_suffix.is_empty()
                && trimmed.ends_with(&self.markers.emoji_request_suffix)
            {
                scan.emoji_message = true;
            }

            // Later timestamps on the same line are ignored.
            if let Some(ts) = first_timestamp(line.text) {
                scan.records.push(TimestampRecord {
                    timestamp: ts.to_string(),
                    line_number: line.number,
                    full_line: trimmed.to_string(),
                });
            }
        }

        tracing::debug!(
            timestamps = scan.records.len(),
            deployed = scan.deployed,
            assertion_error = scan.assertion_error,
            emoji_message = scan.emoji_message,
            "timestamp scan complete"
        );
        scan
    }
}

/// First timestamp substring of `line`, if any.
pub fn first_timestamp(line: &str) -> Option<&str> {
    TIMESTAMP_PATTERN.find(line).map(|m| m.as_str())
}

/// The text following a leading timestamp, e.g. `App is running on 8080`
/// for `2025-07-15 21:14:03 App is running on 8080`.
pub fn message_body(trimmed: &str) -> Option<&str> {
    let m = TIMESTAMP_PATTERN.find(trimmed)?;
    if m.start() != 0 {
        return None;
    }
    Some(trimmed[m.end()..].trim_start())
}

/// True if the line, or its body after a leading timestamp, starts with `prefix`.
/// An empty prefix never matches.
pub fn starts_with_marker(trimmed: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    trimmed.starts_with(prefix) || message_body(trimmed).is_some_and(|b| b.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn scan(raw: &[&str]) -> TimestampScan {
        let markers = MarkerConfig::default();
        TimestampScanner::new(&markers).scan(&lines(raw))
    }

    #[test]
    fn records_first_timestamp_per_line() {
        let s = scan(&[
            "2025-07-15 21:09:00 start then 2025-07-15 21:10:00 again",
            "no timestamp here",
            "  [2025-07-15 21:14:03] done  ",
        ]);
        assert_eq!(s.records.len(), 2);
        assert_eq!(s.records[0].timestamp, "2025-07-15 21:09:00");
        assert_eq!(s.records[0].line_number, 1);
        assert_eq!(s.records[1].timestamp, "2025-07-15 21:14:03");
        assert_eq!(s.records[1].line_number, 3);
        assert_eq!(s.records[1].full_line, "[2025-07-15 21:14:03] done");
    }

    #[test]
    fn rejects_near_miss_formats() {
        let s = scan(&[
            "2025-7-15 21:09:00",
            "2025-07-15T21:09:00",
            "25-07-15 21:09:00",
            "2025-07-15  21:09:00",
        ]);
        assert!(s.records.is_empty());
    }

    #[test]
    fn rejects_non_ascii_digits() {
        // Arabic-Indic digits
        let s = scan(&["٢٠٢٥-٠٧-١٥ ٢١:٠٩:٠٠ start"]);
        assert!(s.records.is_empty());
    }

    #[test]
    fn deploy_flag_on_plain_and_timestamped_lines() {
        assert!(scan(&["  App is running on 8080"]).deployed);
        assert!(scan(&["2025-07-15 21:14:03 App is running on 8080"]).deployed);
        assert!(!scan(&["INFO: App is running on 8080"]).deployed);
    }

    #[test]
    fn assertion_and_emoji_flags() {
        let s = scan(&[
            "2025-07-15 21:10:00 Last user message: [TextRaw(text='Add message with emojis to the app to make it more fun')]",
            "AssertionError: expected 200",
        ]);
        assert!(s.assertion_error);
        assert!(s.emoji_message);
        assert!(s.post_build_error());
    }

    #[test]
    fn assertion_without_emoji_is_not_post_build_error() {
        let s = scan(&["AssertionError: boom"]);
        assert!(s.assertion_error);
        assert!(!s.emoji_message);
        assert!(!s.post_build_error());
    }

    #[test]
    fn flags_are_independent_of_timestamps() {
        let s = scan(&["App is running on 3000"]);
        assert!(s.deployed);
        assert!(s.records.is_empty());
    }

    #[test]
    fn message_body_requires_leading_timestamp() {
        assert_eq!(
            message_body("2025-07-15 21:14:03   hello"),
            Some("hello")
        );
        assert_eq!(message_body("x 2025-07-15 21:14:03 hello"), None);
    }

    #[test]
    fn empty_marker_never_matches() {
        assert!(!starts_with_marker("anything", ""));
    }

    #[test]
    fn empty_input() {
        let s = scan(&[]);
        assert!(s.records.is_empty());
        assert!(!s.deployed && !s.assertion_error && !s.emoji_message);
    }
}
