//! Index selection for partial downloads.
//!
//! Users pick results by their 1-based position as printed, e.g. `1,3-5,8`.
//! The selection is validated as a whole against the number of results: one
//! bad token rejects the entire spec.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// A validated, sorted, duplicate-free set of 0-based result positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSelection {
    indices: Vec<usize>,
}

impl IndexSelection {
    /// Parse a spec like `"1,3-5"` against `total` results.
    ///
    /// Returns `None` for anything invalid; see [`parse_indices`].
    pub fn parse(spec: &str, total: usize) -> Option<Self> {
        parse_indices(spec, total).map(|indices| Self { indices })
    }

    /// The selected 0-based positions in ascending order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected positions
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing is selected (never true for a parsed selection)
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The selected items, in selection order
    pub fn select<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        self.indices
            .iter()
            .filter_map(|&index| items.get(index))
            .collect()
    }
}

/// Parse a comma-separated list of 1-based positions and inclusive ranges
/// into sorted, de-duplicated 0-based indices below `total`.
///
/// Whitespace around tokens and around the range dash is ignored. Returns
/// `None` if the spec is empty, or if any token is not a number or a
/// `start-end` pair, is out of range, or is an inverted range.
pub fn parse_indices(spec: &str, total: usize) -> Option<Vec<usize>> {
    if spec.trim().is_empty() {
        return None;
    }

    let mut selected = BTreeSet::new();
    for token in spec.split(',') {
        let token = token.trim();
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_position(start, total)?;
                let end = parse_position(end, total)?;
                if start > end {
                    return None;
                }
                selected.extend(start..=end);
            }
            None => {
                selected.insert(parse_position(token, total)?);
            }
        }
    }

    Some(selected.into_iter().collect())
}

/// One 1-based position, converted to 0-based and bounds-checked
fn parse_position(token: &str, total: usize) -> Option<usize> {
    let position: usize = token.trim().parse().ok()?;
    let index = position.checked_sub(1)?;
    (index < total).then_some(index)
}

/// Whether a command-line token is shaped like an index spec (digits,
/// commas, dashes and spaces only) rather than a directory name
pub fn looks_like_index_spec(token: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[\d,\-\s]*\d[\d,\-\s]*$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(token))
}
