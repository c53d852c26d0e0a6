use std::io;

use reqwest::StatusCode;

/// A lookup step failed for a reason that may go away on its own.
///
/// "Nothing matched" is never an error; lookups report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server returned {0}")]
    Status(StatusCode),
    #[error("{0} is throttling us with a bot check")]
    Blocked(&'static str),
    #[error("Headless browser failed: {0:#}")]
    Browser(anyhow::Error),
    #[error("An I/O error occurred: {0}")]
    Io(#[from] io::Error),
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Invalid CSS selector {0:?}")]
    Selector(String),
}

impl LookupError {
    /// Whether retrying the same lookup later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Blocked(_) | Self::Browser(_) | Self::Join(_) => true,
            Self::Status(status) => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            Self::Io(_) | Self::Decode(_) | Self::Selector(_) => false,
        }
    }
}

pub type LookupResult<T> = Result<T, LookupError>;
