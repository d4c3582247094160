//! Error types for the fuzzing engine.
//!
//! Only configuration-time problems are fatal. Per-request transport failures
//! are recorded on the outcome itself and never surface as an `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems detected before the first request is sent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to open wordlist {path}: {source}")]
    WordlistOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read wordlist {path}: {source}")]
    WordlistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {field} filter token {token:?}: {reason}")]
    InvalidFilter {
        field: &'static str,
        token: String,
        reason: String,
    },

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid header {0:?}: expected `Name: value`")]
    InvalidHeader(String),

    #[error("unsupported HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("invalid value for {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failures while writing results to an output sink.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
