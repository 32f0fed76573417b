//! The arXiv source and the transport it talks through.
//!
//! [`ArxivSource`] builds search requests, runs them through the retry engine
//! and turns the Atom response into [`Paper`](crate::models::Paper)s via the
//! [`feed`] extractor. All network access goes through the [`Transport`]
//! trait so the HTTP layer ([`HttpClient`](crate::utils::HttpClient)) can be
//! swapped for [`MockTransport`] in tests.

mod arxiv;
pub mod feed;
pub mod mock;

pub use arxiv::{ArxivSource, ARXIV_API_URL, ARXIV_PDF_URL};
pub use mock::{MockTransport, RecordingSleeper};

use async_trait::async_trait;
use std::path::Path;

/// Byte-level access to remote resources
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetch the whole body of `url`
    async fn get(&self, url: &str) -> Result<Vec<u8>, SourceError>;

    /// Stream the body of `url` into `path`, returning the number of bytes
    /// written. A partially written file must not be left behind on error.
    async fn download_to(&self, url: &str, path: &Path) -> Result<u64, SourceError>;
}

/// Errors that can occur when talking to arXiv
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Connect or read timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Any other network or HTTP failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return SourceError::Timeout(err.to_string());
        }
        match err.status() {
            Some(status) => SourceError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            // The URL may carry ids like 2503.01234 that read as status codes
            None => SourceError::Network(err.without_url().to_string()),
        }
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
