//! Utility modules supporting search and download.
//!
//! - [`retry_with_backoff`]: Run a fallible operation with exponential backoff
//! - [`is_retryable`]: Classify an error as transient or permanent
//! - [`Sleeper`] / [`SignalSleeper`]: Waits that Ctrl+C can interrupt
//! - [`HttpClient`]: reqwest-backed [`Transport`](crate::sources::Transport)
//! - [`looks_like_block_page`]: Detect CAPTCHA pages served instead of PDFs
//! - [`IndexSelection`]: Parse `1,3-5` style result selections
//! - [`render_papers`]: Render results as JSON, compact lines or detail blocks
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use xiv::sources::Transport;
//! use xiv::ui::Diagnostics;
//! use xiv::utils::{retry_with_backoff, HttpClient, RetryConfig, SignalSleeper};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let sleeper = SignalSleeper::install();
//! let body = retry_with_backoff(
//!     &RetryConfig::default(),
//!     &sleeper,
//!     &Diagnostics::stderr(),
//!     "ArXiv unavailable",
//!     || client.get("https://export.arxiv.org/api/query?search_query=all"),
//! )
//! .await;
//! # Ok(())
//! # }
//! ```

mod display;
mod http;
mod interrupt;
mod retry;
mod selection;
mod validate;

pub use display::{render_papers, write_papers, OutputStyle};
pub use http::{HttpClient, CONNECT_TIMEOUT, REQUEST_TIMEOUT};
pub use interrupt::{Cancelled, SignalSleeper, Sleeper};
pub use retry::{
    is_retryable, is_retryable_message, retry_with_backoff, RetryConfig, DEFAULT_MAX_ATTEMPTS,
};
pub use selection::{looks_like_index_spec, parse_indices, IndexSelection};
pub use validate::{looks_like_block_page, pdf_filename, CAPTCHA_CHECK_BYTES, MIN_VALID_PDF_SIZE};
