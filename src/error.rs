//! Error types for the harvest pipeline.
//!
//! Every failure below [`HarvestError::Storage`] at open time degrades to
//! "log and skip": the pipeline matches on these variants to decide which
//! counter to bump, never to retry.

use thiserror::Error;

/// Failure reported by an [`Oracle`](crate::oracle::Oracle) backend.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("model backend error: {0}")]
    Backend(String),
}

/// Failure to recover a JSON value from free text.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no JSON payload found in response")]
    NotFound,

    #[error("malformed JSON payload: {source} (response: {preview})")]
    Malformed {
        #[source]
        source: serde_json::Error,
        preview: String,
    },
}

/// Failure while fetching or storing an article image.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image response has no fenced base64 block")]
    MissingBlock,

    #[error("invalid base64 image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("image payload is empty")]
    Empty,

    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Invalid or unreadable harvest configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid site URL {url:?} for {site}")]
    SiteUrl { site: String, url: String },

    #[error("site list is empty")]
    NoSites,

    #[error("article delay must be a finite, non-negative number of seconds, got {0}")]
    Delay(f64),
}

/// Top-level error of a harvest run.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
