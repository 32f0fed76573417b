//! Atom feed extraction.
//!
//! Turns the arXiv API's Atom response into [`Paper`]s: dates are cut to
//! `YYYY-MM-DD`, an optional cutoff date drops older entries, whitespace in
//! titles and abstracts is collapsed and long author lists are summarized.
//! Entries keep their document order; arXiv has already sorted them.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::models::Paper;
use crate::sources::SourceError;

/// Atom feed namespace used by the arXiv API
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Length of a `YYYY-MM-DD` date
const DATE_PREFIX_LENGTH: usize = 10;

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

/// One `<entry>`; other children (links, categories, arxiv:* extensions)
/// are ignored.
#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

/// Parse an Atom document into papers.
///
/// * `since` - drop entries published before this `YYYY-MM-DD` date
/// * `max_authors` - number of author names shown before `et al. (<total>)`
///
/// Malformed XML is returned as [`SourceError::Parse`].
pub fn extract_papers(
    xml: &str,
    since: Option<&str>,
    max_authors: usize,
) -> Result<Vec<Paper>, SourceError> {
    check_single_root(xml)?;
    let feed: Feed = quick_xml::de::from_str(xml)?;
    tracing::debug!("Feed contains {} entries", feed.entries.len());

    let papers = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published: String = entry.published.trim().chars().take(DATE_PREFIX_LENGTH).collect();
            // Fixed-width ISO dates compare correctly as strings
            if since.is_some_and(|cutoff| published.as_str() < cutoff) {
                return None;
            }

            let names: Vec<String> = entry
                .authors
                .iter()
                .map(|author| normalize_whitespace(&author.name))
                .collect();

            Some(Paper::new(
                normalize_whitespace(&entry.title),
                summarize_authors(&names, max_authors),
                published,
                entry.id.trim(),
                normalize_whitespace(&entry.summary),
            ))
        })
        .collect();

    Ok(papers)
}

/// Reject documents that are not exactly one element tree: unclosed
/// elements, or markup or text after the root element closes.
fn check_single_root(xml: &str) -> Result<(), SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut closed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SourceError::Parse(format!("XML: {}", e)))?;
        let trailing = match event {
            Event::Start(_) => {
                depth += 1;
                closed
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                closed = depth == 0;
                false
            }
            Event::Empty(_) if depth == 0 => {
                let trailing = closed;
                closed = true;
                trailing
            }
            Event::Text(text) if depth == 0 => {
                closed && !text.iter().all(u8::is_ascii_whitespace)
            }
            Event::CData(_) if depth == 0 => closed,
            Event::Eof => break,
            _ => false,
        };

        if trailing {
            return Err(SourceError::Parse(format!(
                "XML: content after the root element at byte {}",
                reader.buffer_position()
            )));
        }
    }

    if depth > 0 {
        return Err(SourceError::Parse("XML: unexpected end of document".to_string()));
    }
    Ok(())
}

/// Trim and collapse every whitespace run (newlines included) into one space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join the first `max_authors` names; append ` et al. (<total>)` when
/// there are more
pub fn summarize_authors<S: AsRef<str>>(names: &[S], max_authors: usize) -> String {
    let shown = names
        .iter()
        .take(max_authors)
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");

    if names.len() > max_authors {
        format!("{} et al. ({})", shown, names.len())
    } else {
        shown
    }
}
