//! Fetcher boundary: asks the trends service for interest over time.

pub mod google;
mod wire;

pub use google::{GoogleTrendsClient, GoogleTrendsConfig};

use crate::domain::TrendTable;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream refuses comparisons of more than five terms.
pub const MAX_TERMS: usize = 5;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid trends URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Transport error during {stage}: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Trends service rate limited the {stage} request (HTTP 429)")]
    RateLimited { stage: &'static str },
    #[error("Trends service returned HTTP {status} during {stage}: {body}")]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[error("Could not decode {stage} response: {source}")]
    Decode {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Explore response has no TIMESERIES widget")]
    MissingWidget,
    #[error("Malformed timeline payload: {0}")]
    MalformedPayload(String),
    #[error("No data returned from the trends service")]
    EmptyResult,
}

impl FetchError {
    /// Short variant name for status output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "InvalidUrl",
            Self::Transport { .. } => "Transport",
            Self::RateLimited { .. } => "RateLimited",
            Self::Status { .. } => "Status",
            Self::Decode { .. } => "Decode",
            Self::MissingWidget => "MissingWidget",
            Self::MalformedPayload(_) => "MalformedPayload",
            Self::EmptyResult => "EmptyResult",
        }
    }
}

/// Symbolic time range understood by the trends service. Only ranges the
/// service reports monthly are offered, since rows are keyed by month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeWindow {
    /// Everything since 2004, reported monthly
    #[default]
    All,
}

impl TimeWindow {
    pub fn as_param(&self) -> &'static str {
        match self {
            TimeWindow::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendsRequest {
    pub terms: Vec<String>,
    pub category: u32,
    pub window: TimeWindow,
    pub geo: String,
    /// Property filter: empty for web search, or `images`, `news`, `youtube`, `froogle`.
    pub property: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Table(TrendTable),
    /// The service answered but has no data for this request.
    Empty,
}

#[async_trait]
pub trait TrendsSource: Send + Sync {
    async fn fetch(&self, request: &TrendsRequest) -> Result<FetchOutcome, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_params_match_service_vocabulary() {
        assert_eq!(TimeWindow::All.as_param(), "all");
    }

    #[test]
    fn kind_names_variants() {
        assert_eq!(FetchError::EmptyResult.kind(), "EmptyResult");
        assert_eq!(
            FetchError::RateLimited { stage: "explore" }.kind(),
            "RateLimited"
        );
    }
}
