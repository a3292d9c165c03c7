use crate::fetcher::{GoogleTrendsConfig, MAX_TERMS, TimeWindow, TrendsRequest};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_OUTPUT_FILE: &str = "google_trends_data.xlsx";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Output format of the status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamped lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Search terms to compare (comma-separated, at most five)
    #[arg(
        long = "query",
        env = "TRENDS_QUERIES",
        value_delimiter = ',',
        default_values = ["Marble countertop", "home remodel"]
    )]
    pub queries: Vec<String>,

    /// Trends category id (0 = all categories)
    #[arg(long, env = "TRENDS_CATEGORY", default_value = "0")]
    pub category: u32,

    /// Time window to request
    #[arg(long, env = "TRENDS_TIMEFRAME", value_enum, default_value = "all")]
    pub timeframe: TimeWindow,

    /// Region code, e.g. US
    #[arg(long, env = "TRENDS_GEO", default_value = "US")]
    pub geo: String,

    /// Property filter (empty for web search; images, news, youtube, froogle)
    #[arg(long, env = "TRENDS_GPROP", default_value = "")]
    pub gprop: String,

    /// Host language sent to the trends service
    #[arg(long, env = "TRENDS_HL", default_value = "en-US")]
    pub hl: String,

    /// Timezone offset in minutes sent to the trends service
    #[arg(long, env = "TRENDS_TZ", default_value = "360", allow_negative_numbers = true)]
    pub tz: i32,

    /// Trends service base URL
    #[arg(long, env = "TRENDS_BASE_URL", default_value = "https://trends.google.com")]
    pub base_url: String,

    /// Pause between the explore request and the data request, in milliseconds
    #[arg(long, env = "TRENDS_REQUEST_DELAY_MS", default_value = "2000")]
    pub request_delay_ms: u64,

    /// HTTP timeout in seconds
    #[arg(long, env = "TRENDS_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Spreadsheet holding the cumulative history [default: google_trends_data.xlsx next to the executable]
    #[arg(long, env = "TRENDS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Sheet name inside the spreadsheet
    #[arg(long, env = "TRENDS_SHEET", default_value = "Trends Data")]
    pub sheet: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path (TOML); replaces command-line values when given
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queries: vec!["Marble countertop".to_string(), "home remodel".to_string()],
            category: 0,
            timeframe: TimeWindow::All,
            geo: "US".to_string(),
            gprop: String::new(),
            hl: "en-US".to_string(),
            tz: 360,
            base_url: "https://trends.google.com".to_string(),
            request_delay_ms: 2000,
            timeout_secs: 30,
            output: None,
            sheet: "Trends Data".to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            config_file: None,
        }
    }
}

impl Config {
    /// Parses arguments (with env fallbacks), loads `--config-file` if given,
    /// and validates the result.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;
        match &config.config_file {
            Some(path) => Self::from_file(path),
            None => {
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = Some(path.as_ref().to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queries.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one query is required".to_string(),
            ));
        }

        if self.queries.len() > MAX_TERMS {
            return Err(ConfigError::InvalidConfig(format!(
                "At most {MAX_TERMS} queries can be compared, got {}",
                self.queries.len()
            )));
        }

        if self.queries.iter().any(|query| query.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig(
                "Queries must not be blank".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.queries.iter().find(|query| !seen.insert(query.trim())) {
            return Err(ConfigError::InvalidConfig(format!(
                "Duplicate query: '{duplicate}'"
            )));
        }

        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        if self.sheet.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Sheet name must not be empty".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn terms(&self) -> Vec<String> {
        self.queries
            .iter()
            .map(|query| query.trim().to_string())
            .collect()
    }

    /// The configured output, or the default file beside the executable.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => executable_dir().join(DEFAULT_OUTPUT_FILE),
        }
    }

    pub fn trends_request(&self) -> TrendsRequest {
        TrendsRequest {
            terms: self.terms(),
            category: self.category,
            window: self.timeframe,
            geo: self.geo.clone(),
            property: self.gprop.clone(),
        }
    }

    pub fn google_config(&self) -> GoogleTrendsConfig {
        GoogleTrendsConfig {
            base_url: self.base_url.clone(),
            hl: self.hl.clone(),
            tz: self.tz,
            request_delay: Duration::from_millis(self.request_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        }
    }
}

// Falls back to the working directory when the executable path is unknown.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}
