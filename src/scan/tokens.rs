/// Token usage scanning.
///
/// Matches lines of the form
/// `Provider: <p> | Model: <m> | Input tokens: <n> | Output tokens: <n> | Total tokens: <n>`
/// (case-insensitive) and sums them per provider.
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)Provider: ([^|]+) \| Model: ([^|]+) \| Input tokens: ([0-9]+) \| Output tokens: ([0-9]+) \| Total tokens: ([0-9]+)",
    )
    .unwrap()
});

/// Summed counters for one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProviderUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// As reported by the log line; never recomputed from input + output.
    pub total_tokens: u64,
    pub api_calls: u64,
}

impl ProviderUsage {
    /// Metric names paired with their values, in column order.
    pub fn metrics(&self) -> [(&'static str, u64); 4] {
        [
            ("input_tokens", self.input_tokens),
            ("output_tokens", self.output_tokens),
            ("total_tokens", self.total_tokens),
            ("api_calls", self.api_calls),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub provider: String,
    pub usage: ProviderUsage,
}

/// Per-provider usage in first-seen order.
///
/// Keys are the trimmed provider text exactly as logged, so `Anthropic` and
/// `anthropic` are separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    entries: Vec<ProviderEntry>,
}

/// Serializes as a provider-keyed map, keys in first-seen order.
impl Serialize for TokenUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.provider, &entry.usage)?;
        }
        map.end()
    }
}

impl TokenUsage {
    #[cfg(test)]
    pub fn get(&self, provider: &str) -> Option<&ProviderUsage> {
        self.entries
            .iter()
            .find(|e| e.provider == provider)
            .map(|e| &e.usage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of `api_calls` across all providers.
    pub fn total_api_calls(&self) -> u64 {
        self.entries.iter().map(|e| e.usage.api_calls).sum()
    }

    fn record(&mut self, provider: &str, input: u64, output: u64, total: u64) {
        let idx = match self.entries.iter().position(|e| e.provider == provider) {
            Some(i) => i,
            None => {
                self.entries.push(ProviderEntry {
                    provider: provider.to_string(),
                    usage: ProviderUsage::default(),
                });
                self.entries.len() - 1
            }
        };
        let usage = &mut self.entries[idx].usage;
        usage.input_tokens = usage.input_tokens.saturating_add(input);
        usage.output_tokens = usage.output_tokens.saturating_add(output);
        usage.total_tokens = usage.total_tokens.saturating_add(total);
        usage.api_calls += 1;
    }
}

/// Scan lines for token usage annotations.
pub fn scan_token_usage(lines: &[String]) -> TokenUsage {
    let mut usage = TokenUsage::default();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = TOKEN_PATTERN.captures(line) else {
            continue;
        };
        let provider = caps[1].trim();
        let counts = (
            caps[3].parse::<u64>(),
            caps[4].parse::<u64>(),
            caps[5].parse::<u64>(),
        );
        match counts {
            (Ok(input), Ok(output), Ok(total)) => {
                usage.record(provider, input, output, total);
            }
            _ => {
                tracing::debug!(
                    line_number = idx + 1,
                    provider,
                    "token count out of range, skipping line"
                );
            }
        }
    }

    usage
}
