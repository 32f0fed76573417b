//! arXiv search: request construction, retries and feed extraction.

use std::sync::Arc;

use url::Url;

use crate::models::{Paper, SearchQuery};
use crate::sources::feed::extract_papers;
use crate::sources::{SourceError, Transport};
use crate::ui::Diagnostics;
use crate::utils::{retry_with_backoff, RetryConfig, Sleeper};

/// Base URL for arXiv API
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// Category searched when none is given
pub const DEFAULT_CATEGORY: &str = "cs.RO";

/// Client for the arXiv query API
///
/// Supports:
/// - Search by query, categories and publication cutoff
/// - Building PDF URLs for download
#[derive(Debug, Clone)]
pub struct ArxivSource {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    diag: Diagnostics,
    retry: RetryConfig,
    default_category: String,
    max_authors: usize,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        diag: Diagnostics,
    ) -> Self {
        Self {
            transport,
            sleeper,
            diag,
            retry: RetryConfig::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
            max_authors: 3,
        }
    }

    /// Set the retry policy for search requests
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Category searched when the query names none
    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Number of authors shown before `et al.`
    pub fn max_authors(mut self, max_authors: usize) -> Self {
        self.max_authors = max_authors;
        self
    }

    /// Build the `search_query` expression: `(cat:A OR cat:B) AND (<query>)`
    pub fn build_search_query(&self, query: &SearchQuery) -> String {
        let categories = if query.categories.is_empty() {
            format!("cat:{}", self.default_category)
        } else {
            query
                .categories
                .iter()
                .map(|c| format!("cat:{}", c))
                .collect::<Vec<_>>()
                .join(" OR ")
        };

        format!("({}) AND ({})", categories, query.query)
    }

    /// Full API request URL for a query
    pub fn search_url(&self, query: &SearchQuery) -> Result<Url, SourceError> {
        let search_query = self.build_search_query(query);
        let max_results = query.max_results.to_string();
        let url = Url::parse_with_params(
            ARXIV_API_URL,
            &[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", query.sort.api_value()),
                ("sortOrder", "descending"),
            ],
        )
        .map_err(|e| SourceError::Network(format!("Invalid API URL: {}", e)))?;

        Ok(url)
    }

    /// PDF URL for a paper
    pub fn pdf_url(paper: &Paper) -> String {
        format!("{}/{}.pdf", ARXIV_PDF_URL, paper.item_id())
    }

    /// Search arXiv.
    ///
    /// A request that still fails after all retries yields an empty list, so
    /// "nothing matched" and "arXiv unreachable" look the same here; the
    /// retry engine has already told the user which one it was. Only a
    /// response that is not valid XML is an error.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = self.search_url(query)?;
        tracing::debug!("Querying arXiv: {}", url);

        let transport = Arc::clone(&self.transport);
        let body = retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            &self.diag,
            "ArXiv unavailable",
            || {
                let transport = Arc::clone(&transport);
                let url = url.clone();
                async move { transport.get(url.as_str()).await }
            },
        )
        .await;

        let Some(body) = body else {
            return Ok(Vec::new());
        };

        let xml = match String::from_utf8(body) {
            Ok(xml) => xml,
            Err(e) => {
                tracing::warn!("arXiv response is not valid UTF-8, decoding lossily: {}", e);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        if xml.trim().is_empty() {
            return Ok(Vec::new());
        }

        extract_papers(&xml, query.since.as_deref(), self.max_authors)
    }
}
