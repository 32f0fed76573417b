//! Search request models.

use std::fmt;
use std::str::FromStr;

/// Sort key for search results
///
/// Results are always requested in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Submission date (newest first)
    #[default]
    Date,
    /// Last update date
    Updated,
    /// Relevance to the query
    Relevance,
}

impl SortKey {
    /// All keys, in the order they are listed to users
    pub const ALL: [SortKey; 3] = [SortKey::Date, SortKey::Updated, SortKey::Relevance];

    /// The short name accepted on the command line and in `XIV_SORT`
    pub fn name(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Updated => "updated",
            SortKey::Relevance => "relevance",
        }
    }

    /// The `sortBy` value understood by the arXiv API
    pub fn api_value(&self) -> &'static str {
        match self {
            SortKey::Date => "submittedDate",
            SortKey::Updated => "lastUpdatedDate",
            SortKey::Relevance => "relevance",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sort key '{}'", s))
    }
}

/// Search query parameters
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Main search expression (`all` matches everything)
    pub query: String,

    /// Categories OR-ed together, e.g. `cs.RO`, `cs.AI`
    pub categories: Vec<String>,

    /// Maximum number of results to request
    pub max_results: usize,

    /// Sort key
    pub sort: SortKey,

    /// Drop entries published before this `YYYY-MM-DD` date
    pub since: Option<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: "all".to_string(),
            categories: Vec::new(),
            max_results: 10,
            sort: SortKey::Date,
            since: None,
        }
    }
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Add a category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Set the sort key
    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Only keep papers published on or after `date` (`YYYY-MM-DD`)
    pub fn since(mut self, date: impl Into<String>) -> Self {
        self.since = Some(date.into());
        self
    }
}
