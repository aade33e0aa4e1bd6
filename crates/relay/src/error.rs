use std::path::{Path, PathBuf};

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing URL")]
    MissingUrl,

    #[error("Could not load master playlist")]
    MasterUnavailable {
        url: String,
        #[source]
        source: Box<RelayError>,
    },

    #[error("No streams found")]
    NoStreams,


    #[error("HTTP request failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("I/O error while {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl RelayError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn master_unavailable(url: impl Into<String>, source: RelayError) -> Self {
        Self::MasterUnavailable {
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Filesystem and configuration details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingUrl
            | Self::MasterUnavailable { .. }
            | Self::NoStreams => self.to_string(),
            Self::Network { .. } | Self::HttpStatus { .. } | Self::EmptyBody { .. } => {
                "Upstream request failed".to_owned()
            }
            Self::Io { .. } => "Failed to write stream cache".to_owned(),
            Self::Configuration { .. } => "Relay is misconfigured".to_owned(),
        }
    }
}
