//! # xiv
//!
//! Search arXiv from the command line and download the matching PDFs.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, SearchQuery, download outcomes)
//! - [`sources`]: The arXiv source, the Atom feed extractor and the transport trait
//! - [`download`]: Sequential, rate-limited PDF downloads
//! - [`utils`]: Retry engine, HTTP client, CAPTCHA detection, index selection, rendering
//! - [`config`]: Configuration from `XIV_*` environment variables
//! - [`ui`]: Human-readable progress output

pub mod config;
pub mod download;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use download::Downloader;
pub use models::Paper;
pub use sources::{ArxivSource, SourceError, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
