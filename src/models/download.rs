//! Download outcome models.

/// Result of downloading a single paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The PDF was saved
    Success,
    /// The download failed (network, server or filesystem error)
    Failure,
    /// The server answered with a CAPTCHA / bot-block page; nothing was kept
    Blocked,
}

/// Aggregate counts for a batch of downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of papers selected for download
    pub total: usize,
    /// Papers saved successfully
    pub saved: usize,
    /// Papers rejected by the block-page check
    pub blocked: usize,
    /// Papers that failed for any other reason
    pub failed: usize,
    /// Whether the batch stopped early on Ctrl+C
    pub cancelled: bool,
}

impl BatchReport {
    /// Start an empty report for `total` selected papers
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Count one finished download
    pub fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Success => self.saved += 1,
            DownloadOutcome::Failure => self.failed += 1,
            DownloadOutcome::Blocked => self.blocked += 1,
        }
    }

    /// Number of papers attempted so far
    pub fn processed(&self) -> usize {
        self.saved + self.failed + self.blocked
    }
}
