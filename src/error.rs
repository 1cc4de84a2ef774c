//! Error types for fetching, decoding and configuring the NEO feed.

use chrono::NaiveDate;
use thiserror::Error;

/// Failure raised while producing a feed payload or a chart range.
///
/// The store never lets these escape to observers as panics; they are carried
/// inside [`FetchState::Failed`](crate::store::FetchState::Failed).
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Field-less discriminant of [`FeedError`], handy for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    Transport,
    Decode,
    InvalidRange,
}

impl FeedError {
    pub fn kind(&self) -> FeedErrorKind {
        match self {
            FeedError::Transport(_) => FeedErrorKind::Transport,
            FeedError::Decode(_) => FeedErrorKind::Decode,
            FeedError::InvalidRange { .. } => FeedErrorKind::InvalidRange,
        }
    }
}

/// Problems with the process-wide feed configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid feed endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("API key is set but empty")]
    MissingApiKey,
}
