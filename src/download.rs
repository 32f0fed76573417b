//! PDF download of search results.
//!
//! [`Downloader::download_paper`] fetches one paper with its own retry loop
//! and rejects CAPTCHA pages served in place of the PDF.
//! [`Downloader::download_all`] runs a batch sequentially with a polite delay
//! between items and tallies the outcomes into a [`BatchReport`].
//!
//! Ctrl+C has different reach depending on where it lands: during a retry
//! backoff it abandons only the current paper, during the delay between
//! papers it stops the whole batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{BatchReport, DownloadOutcome, Paper};
use crate::sources::{ArxivSource, SourceError, Transport};
use crate::ui::Diagnostics;
use crate::utils::{looks_like_block_page, pdf_filename, IndexSelection, RetryConfig, Sleeper};

/// Default pause between two downloads of a batch
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_secs(3);

/// Sequential, rate-limited PDF downloader
#[derive(Debug, Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    diag: Diagnostics,
    retry: RetryConfig,
    delay: Duration,
}

impl Downloader {
    /// Create a downloader with the default retry policy and delay
    pub fn new(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>, diag: Diagnostics) -> Self {
        Self {
            transport,
            sleeper,
            diag,
            retry: RetryConfig::default(),
            delay: DEFAULT_DOWNLOAD_DELAY,
        }
    }

    /// Set the retry policy for each paper
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pause between downloads
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Download one paper into `dir`.
    ///
    /// Progress is written as `  <id>... ` followed by `OK`, `CAPTCHA` or
    /// `Err`, with `retry <n>s... ` fragments in between. Never fails: every
    /// problem is folded into the returned outcome.
    pub async fn download_paper(&self, paper: &Paper, dir: &Path) -> DownloadOutcome {
        let item_id = paper.item_id();
        let path = download_path(paper, dir);
        let url = ArxivSource::pdf_url(paper);

        write!(self.diag, "  {}... ", item_id);

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Cannot create download directory {}: {}", dir.display(), e);
            writeln!(self.diag, "Err");
            return DownloadOutcome::Failure;
        }

        let mut attempt = 0;
        loop {
            match self.fetch(&url, &path).await {
                Ok(bytes) => {
                    tracing::debug!("Fetched {} ({} bytes)", url, bytes);
                    return self.validate(&path).await;
                }
                Err(error) if self.retry.should_retry(attempt, &error) => {
                    let wait = self.retry.delay_for(attempt);
                    tracing::debug!("Retrying {} after: {}", item_id, error);
                    write!(self.diag, "retry {}s... ", wait.as_secs());

                    if self.sleeper.sleep(wait).await.is_err() {
                        writeln!(self.diag, "cancelled");
                        return DownloadOutcome::Failure;
                    }
                    attempt += 1;
                }
                Err(error) => {
                    tracing::warn!("Download of {} failed: {}", item_id, error);
                    writeln!(self.diag, "Err");
                    return DownloadOutcome::Failure;
                }
            }
        }
    }

    /// Fetch `url` into `path`, leaving no partial file behind on failure
    async fn fetch(&self, url: &str, path: &Path) -> Result<u64, SourceError> {
        let result = self.transport.download_to(url, path).await;
        if result.is_err() {
            remove_if_present(path).await;
        }
        result
    }

    async fn validate(&self, path: &Path) -> DownloadOutcome {
        let owned = path.to_path_buf();
        let verdict = tokio::task::spawn_blocking(move || looks_like_block_page(&owned))
            .await
            .unwrap_or_else(|e| Err(std::io::Error::new(std::io::ErrorKind::Other, e)));

        match verdict {
            Ok(false) => {
                writeln!(self.diag, "OK");
                DownloadOutcome::Success
            }
            Ok(true) => {
                remove_if_present(path).await;
                writeln!(self.diag, "CAPTCHA");
                DownloadOutcome::Blocked
            }
            Err(e) => {
                tracing::warn!("Cannot inspect {}: {}", path.display(), e);
                remove_if_present(path).await;
                writeln!(self.diag, "Err");
                DownloadOutcome::Failure
            }
        }
    }

    /// Download the selected papers (all of them without a selection) into
    /// `dir`, one after another.
    ///
    /// A Ctrl+C during the delay between papers stops the batch; the
    /// returned report then has `cancelled` set and the caller is expected
    /// to exit with status 130.
    pub async fn download_all(
        &self,
        papers: &[Paper],
        dir: &Path,
        selection: Option<&IndexSelection>,
    ) -> BatchReport {
        let selected: Vec<&Paper> = match selection {
            Some(selection) => selection.select(papers),
            None => papers.iter().collect(),
        };
        let total = selected.len();
        let mut report = BatchReport::new(total);

        writeln!(self.diag, "\nDownloading to '{}/'...", dir.display());
        if total > 1 {
            writeln!(
                self.diag,
                "Rate limiting: {:.1}s delay between downloads",
                self.delay.as_secs_f64()
            );
        }

        for (i, paper) in selected.into_iter().enumerate() {
            write!(self.diag, "[{}/{}] ", i + 1, total);
            let outcome = self.download_paper(paper, dir).await;
            report.record(outcome);

            if i + 1 < total && self.sleeper.sleep(self.delay).await.is_err() {
                writeln!(self.diag, "\n\nDownload cancelled by user.");
                writeln!(
                    self.diag,
                    "{}/{} saved before cancellation",
                    report.saved, total
                );
                report.cancelled = true;
                return report;
            }
        }

        write!(self.diag, "\n{}/{} saved", report.saved, total);
        if report.blocked > 0 {
            writeln!(self.diag, ", {} CAPTCHA blocked\n", report.blocked);
            writeln!(self.diag, "Rate limit triggered. Try:");
            writeln!(self.diag, "  - Wait a few minutes before retrying");
            writeln!(self.diag, "  - Reduce downloads: -n <number>");
            writeln!(self.diag, "  - Increase delay: XIV_DOWNLOAD_DELAY=5.0");
        }
        writeln!(self.diag);

        report
    }
}

/// Local path a paper is saved to inside `dir`
pub fn download_path(paper: &Paper, dir: &Path) -> PathBuf {
    dir.join(pdf_filename(paper.item_id()))
}

async fn remove_if_present(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{MockResponse, MockTransport};
    use crate::sources::RecordingSleeper;
    use crate::ui::CapturedOutput;

    const CAPTCHA_PAGE: &str = "<!DOCTYPE html><html><body>captcha</body></html>";

    fn pdf_bytes() -> Vec<u8> {
        let mut data = b"%PDF-1.5\n".to_vec();
        data.resize(150_000, b'0');
        data
    }

    fn paper(id: &str) -> Paper {
        Paper::new(
            format!("Paper {}", id),
            "A. Author",
            "2025-10-16",
            format!("http://arxiv.org/abs/{}", id),
            "Abstract",
        )
    }

    fn downloader(
        responses: Vec<MockResponse>,
        sleeper: RecordingSleeper,
    ) -> (Downloader, Arc<MockTransport>, Arc<RecordingSleeper>, CapturedOutput) {
        let transport = Arc::new(MockTransport::new(responses));
        let sleeper = Arc::new(sleeper);
        let (diag, captured) = Diagnostics::capture();
        let downloader = Downloader::new(transport.clone(), sleeper.clone(), diag);
        (downloader, transport, sleeper, captured)
    }

    #[tokio::test]
    async fn test_download_paper_success() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, _, captured) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Success);
        assert!(dir.path().join("2510.14567v1.pdf").exists());
        assert_eq!(
            transport.requests(),
            vec!["https://arxiv.org/pdf/2510.14567v1.pdf".to_string()]
        );
        assert_eq!(captured.contents(), "  2510.14567v1... OK\n");
    }

    #[tokio::test]
    async fn test_download_paper_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let (dl, _, _, _) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());

        let outcome = dl.download_paper(&paper("2510.00001v1"), &nested).await;
        assert_eq!(outcome, DownloadOutcome::Success);
        assert!(nested.join("2510.00001v1.pdf").exists());
    }

    #[tokio::test]
    async fn test_download_paper_directory_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let file = scratch.path().join("not-a-dir");
        std::fs::write(&file, b"occupied").unwrap();
        let (dl, transport, sleeper, captured) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());

        let outcome = dl.download_paper(&paper("2510.14567v1"), &file).await;

        assert_eq!(outcome, DownloadOutcome::Failure);
        assert_eq!(captured.contents(), "  2510.14567v1... Err\n");
        assert!(transport.requests().is_empty());
        assert!(sleeper.waits().is_empty());
        assert_eq!(std::fs::read(&file).unwrap(), b"occupied");
    }

    #[tokio::test]
    async fn test_download_paper_blocked_page_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, _, _, captured) =
            downloader(vec![MockResponse::text(CAPTCHA_PAGE)], RecordingSleeper::new());

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Blocked);
        assert!(!dir.path().join("2510.14567v1.pdf").exists());
        assert!(captured.contents().ends_with("CAPTCHA\n"));
    }

    #[tokio::test]
    async fn test_download_paper_retries_transient_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, sleeper, captured) = downloader(
            vec![
                MockResponse::Status(503),
                MockResponse::Timeout,
                MockResponse::Body(pdf_bytes()),
            ],
            RecordingSleeper::new(),
        );

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Success);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(
            captured.contents(),
            "  2510.14567v1... retry 1s... retry 2s... OK\n"
        );
    }

    #[tokio::test]
    async fn test_download_paper_permanent_error_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, sleeper, captured) =
            downloader(vec![MockResponse::Status(404)], RecordingSleeper::new());

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failure);
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.waits().is_empty());
        assert!(captured.contents().ends_with("Err\n"));
    }

    #[tokio::test]
    async fn test_download_paper_exhausts_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, sleeper, _) = downloader(
            vec![
                MockResponse::Status(502),
                MockResponse::Status(502),
                MockResponse::Status(502),
                MockResponse::Body(pdf_bytes()),
            ],
            RecordingSleeper::new(),
        );

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failure);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[tokio::test]
    async fn test_download_paper_partial_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, _, _, _) = downloader(
            vec![MockResponse::Truncated(b"%PDF-1.5 partial".to_vec())],
            RecordingSleeper::new(),
        );

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failure);
        assert!(!dir.path().join("2510.14567v1.pdf").exists());
    }

    #[tokio::test]
    async fn test_cancel_during_retry_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, _, captured) = downloader(
            vec![MockResponse::Status(503), MockResponse::Body(pdf_bytes())],
            RecordingSleeper::cancelling_at(0),
        );

        let outcome = dl.download_paper(&paper("2510.14567v1"), dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Failure);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(captured.contents(), "  2510.14567v1... retry 1s... cancelled\n");
    }

    #[tokio::test]
    async fn test_old_style_id_saved_flat() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, _, _) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());
        let old = paper("math.GT/0104020v1");

        let outcome = dl.download_paper(&old, dir.path()).await;

        assert_eq!(outcome, DownloadOutcome::Success);
        assert_eq!(
            transport.requests(),
            vec!["https://arxiv.org/pdf/math.GT/0104020v1.pdf".to_string()]
        );
        assert!(download_path(&old, dir.path()).exists());
        assert!(dir.path().join("math.GT-0104020v1.pdf").exists());
    }

    #[tokio::test]
    async fn test_download_all_reports_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, _, sleeper, captured) = downloader(
            vec![MockResponse::text(CAPTCHA_PAGE), MockResponse::Body(pdf_bytes())],
            RecordingSleeper::new(),
        );
        let papers = vec![paper("2510.00001v1"), paper("2510.00002v1")];

        let report = dl.download_all(&papers, dir.path(), None).await;

        assert_eq!(report.saved, 1);
        assert_eq!(report.blocked, 1);
        assert!(!report.cancelled);
        assert_eq!(sleeper.waits(), vec![DEFAULT_DOWNLOAD_DELAY]);

        let out = captured.contents();
        assert!(out.contains("Rate limiting: 3.0s delay between downloads\n"));
        assert!(out.contains("[1/2]   2510.00001v1... CAPTCHA\n"));
        assert!(out.contains("[2/2]   2510.00002v1... OK\n"));
        assert!(out.contains("\n1/2 saved, 1 CAPTCHA blocked\n"));
        assert!(out.contains("Increase delay: XIV_DOWNLOAD_DELAY=5.0"));
    }

    #[tokio::test]
    async fn test_download_all_continues_after_directory_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let file = scratch.path().join("not-a-dir");
        std::fs::write(&file, b"occupied").unwrap();
        let (dl, transport, sleeper, captured) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());
        let papers = vec![paper("2510.00001v1"), paper("2510.00002v1")];

        let report = dl.download_all(&papers, &file, None).await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.saved, 0);
        assert!(!report.cancelled);
        assert!(transport.requests().is_empty());
        assert_eq!(sleeper.waits(), vec![DEFAULT_DOWNLOAD_DELAY]);

        let out = captured.contents();
        assert!(out.contains("[1/2]   2510.00001v1... Err\n"));
        assert!(out.contains("[2/2]   2510.00002v1... Err\n"));
        assert!(out.ends_with("\n0/2 saved\n"));
    }

    #[tokio::test]
    async fn test_download_all_with_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, sleeper, captured) =
            downloader(vec![MockResponse::Body(pdf_bytes())], RecordingSleeper::new());
        let papers = vec![paper("2510.00001v1"), paper("2510.00002v1"), paper("2510.00003v1")];
        let selection = IndexSelection::parse("3", papers.len()).unwrap();

        let report = dl.download_all(&papers, dir.path(), Some(&selection)).await;

        assert_eq!(report.total, 1);
        assert_eq!(report.saved, 1);
        assert!(sleeper.waits().is_empty());
        assert_eq!(
            transport.requests(),
            vec!["https://arxiv.org/pdf/2510.00003v1.pdf".to_string()]
        );

        let out = captured.contents();
        assert!(!out.contains("Rate limiting"));
        assert!(out.ends_with("\n1/1 saved\n"));
    }

    #[tokio::test]
    async fn test_download_all_cancelled_between_items() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, transport, _, captured) = downloader(
            vec![MockResponse::Body(pdf_bytes()), MockResponse::Body(pdf_bytes())],
            RecordingSleeper::cancelling_at(0),
        );
        let papers = vec![paper("2510.00001v1"), paper("2510.00002v1"), paper("2510.00003v1")];

        let report = dl
            .delay(Duration::from_millis(500))
            .download_all(&papers, dir.path(), None)
            .await;

        assert!(report.cancelled);
        assert_eq!(report.saved, 1);
        assert_eq!(report.processed(), 1);
        assert_eq!(transport.requests().len(), 1);

        let out = captured.contents();
        assert!(out.contains("Rate limiting: 0.5s delay"));
        assert!(out.ends_with("\n\nDownload cancelled by user.\n1/3 saved before cancellation\n"));
    }
}
