//! Validation of downloaded files and of the filenames they are saved under.
//!
//! arXiv answers aggressive downloading with a small HTML CAPTCHA page served
//! in place of the PDF, with a success status. [`looks_like_block_page`]
//! catches these by size and leading bytes. [`pdf_filename`] keeps paper ids
//! from escaping the output directory.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Files at least this large are assumed to be real PDFs
pub const MIN_VALID_PDF_SIZE: u64 = 100_000;

/// Number of leading bytes inspected for HTML markers
pub const CAPTCHA_CHECK_BYTES: u64 = 1024;

/// Markers of an HTML block page, matched against lower-cased bytes
const BLOCK_PAGE_MARKERS: [&[u8]; 3] = [b"<html", b"captcha", b"<!doctype"];

/// Whether the file at `path` is a CAPTCHA / bot-block page rather than a
/// document.
///
/// Files of [`MIN_VALID_PDF_SIZE`] bytes or more are never flagged. Smaller
/// files are flagged when their first [`CAPTCHA_CHECK_BYTES`] bytes contain
/// `<html`, `captcha` or `<!doctype`, case-insensitively. This is a
/// heuristic: a tiny genuine PDF embedding one of those strings up front
/// would be rejected.
pub fn looks_like_block_page(path: &Path) -> io::Result<bool> {
    let file = File::open(path)?;
    if file.metadata()?.len() >= MIN_VALID_PDF_SIZE {
        return Ok(false);
    }

    let mut head = Vec::with_capacity(CAPTCHA_CHECK_BYTES as usize);
    file.take(CAPTCHA_CHECK_BYTES).read_to_end(&mut head)?;
    head.make_ascii_lowercase();

    Ok(BLOCK_PAGE_MARKERS
        .iter()
        .any(|marker| contains_bytes(&head, marker)))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Local filename for a paper id: path separators become `-` and `.pdf` is
/// appended, so `math.GT/0104020v1` is saved as `math.GT-0104020v1.pdf`.
pub fn pdf_filename(item_id: &str) -> String {
    let stem: String = item_id
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let stem = match stem.as_str() {
        "" | "." | ".." => "paper",
        _ => stem.as_str(),
    };
    format!("{}.pdf", stem)
}
