//! Core data models for papers, searches and downloads.

mod download;
mod paper;
mod search;

pub use download::{BatchReport, DownloadOutcome};
pub use paper::Paper;
pub use search::{SearchQuery, SortKey};
