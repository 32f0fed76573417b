//! Paper model representing one arXiv search result.

use serde::{Deserialize, Serialize};

/// A paper returned by an arXiv search
///
/// Every field is always present. Text fields are whitespace-normalized by
/// the feed extractor, `authors` is already formatted for display and
/// `published` is a `YYYY-MM-DD` date.
///
/// Field order is the serialization order of the JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Display-ready author list, e.g. `"A, B, C et al. (6)"`; empty when
    /// the entry had no authors
    pub authors: String,

    /// Publication date (`YYYY-MM-DD`)
    pub published: String,

    /// Canonical abstract page URL, e.g. `http://arxiv.org/abs/2510.12345v1`
    pub link: String,

    /// Abstract text
    pub r#abstract: String,
}

impl Paper {
    /// Create a paper from already-normalized fields
    pub fn new(
        title: impl Into<String>,
        authors: impl Into<String>,
        published: impl Into<String>,
        link: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors: authors.into(),
            published: published.into(),
            link: link.into(),
            r#abstract: abstract_text.into(),
        }
    }

    /// The arXiv identifier this paper's link points at.
    ///
    /// Everything after `/abs/` when present, which keeps old-style ids such
    /// as `math.GT/0104020v1` intact; otherwise the trailing path segment.
    pub fn item_id(&self) -> &str {
        let link = self.link.trim_end_matches('/');
        if let Some(pos) = link.find("/abs/") {
            return &link[pos + 5..];
        }
        link.rsplit('/').next().unwrap_or(link)
    }
}
