use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Extraction settings, optionally loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ExtractConfig {
    pub markers: MarkerConfig,
    pub build: BuildConfig,
    pub input: InputConfig,
}

/// Literal sentinel strings recognized in log lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Prefix of the line printed once the built app is serving.
    pub deploy_prefix: String,
    pub assertion_prefix: String,
    /// Suffix of the line echoing the emoji follow-up request.
    pub emoji_request_suffix: String,
    /// Substring marking container teardown; such a trailing line is not the run's end.
    pub teardown: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BuildConfig {
    pub policy: BuildPolicy,
}

/// How `build_status` is decided for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPolicy {
    /// Success when a deploy line was seen anywhere and the run did not hit
    /// an assertion error after the emoji follow-up request.
    #[default]
    DeployFlag,
    /// Deprecated: success when the last timestamped line is the deploy line.
    LastLine,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// File extension (without the dot) of log files in a folder.
    pub extension: String,
}

// --- Default implementations ---

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            deploy_prefix: "App is running on".to_string(),
            assertion_prefix: "AssertionError".to_string(),
            emoji_request_suffix: "Last user message: [TextRaw(text='Add message with emojis to the app to make it more fun')]".to_string(),
            teardown: "Stopping Docker containers".to_string(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extension: "log".to_string(),
        }
    }
}

impl ExtractConfig {
    /// Load config from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ExtractConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        if config.build.policy == BuildPolicy::LastLine {
            tracing::warn!(
                path = %path.display(),
                "build policy `last-line` is deprecated, prefer `deploy-flag`"
            );
        }
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Errors from loading a config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}
