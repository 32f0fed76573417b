//! Scripted transport and sleeper for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::sources::{SourceError, Transport};
use crate::utils::{Cancelled, Sleeper};

/// One scripted reply of a [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// 200 with this body
    Body(Vec<u8>),
    /// Non-success HTTP status
    Status(u16),
    /// Request timed out
    Timeout,
    /// Opaque network failure with this message
    Network(String),
    /// Writes these bytes to the target file, then fails mid-stream without
    /// cleaning up (only meaningful for `download_to`)
    Truncated(Vec<u8>),
}

impl MockResponse {
    /// A 200 reply with a text body
    pub fn text(body: &str) -> Self {
        MockResponse::Body(body.as_bytes().to_vec())
    }

    fn into_error(self, url: &str) -> SourceError {
        match self {
            MockResponse::Status(status) => SourceError::Status {
                status,
                url: url.to_string(),
            },
            MockResponse::Timeout => SourceError::Timeout(format!("timeout fetching {}", url)),
            MockResponse::Network(message) => SourceError::Network(message),
            MockResponse::Body(_) | MockResponse::Truncated(_) => {
                SourceError::Network("connection reset by peer".to_string())
            }
        }
    }
}

/// A transport that replays queued responses in order and records every URL
/// it was asked for. An empty queue answers 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a mock with the given replies queued
    pub fn new(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply
    pub fn push(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next(&self, url: &str) -> MockResponse {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MockResponse::Status(404))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        match self.next(url) {
            MockResponse::Body(body) => Ok(body),
            other => Err(other.into_error(url)),
        }
    }

    async fn download_to(&self, url: &str, path: &Path) -> Result<u64, SourceError> {
        match self.next(url) {
            MockResponse::Body(body) => {
                std::fs::write(path, &body)?;
                Ok(body.len() as u64)
            }
            MockResponse::Truncated(partial) => {
                std::fs::write(path, &partial)?;
                Err(MockResponse::Truncated(partial).into_error(url))
            }
            other => Err(other.into_error(url)),
        }
    }
}

/// A sleeper that returns immediately and records each requested wait.
///
/// Optionally reports [`Cancelled`] on the n-th wait (0-based), as if the
/// user pressed Ctrl+C during it.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
    cancel_at: Option<usize>,
}

impl RecordingSleeper {
    /// A sleeper that is never interrupted
    pub fn new() -> Self {
        Self::default()
    }

    /// A sleeper whose `index`-th wait is interrupted
    pub fn cancelling_at(index: usize) -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            cancel_at: Some(index),
        }
    }

    /// Durations requested so far, including an interrupted one
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let mut waits = self.waits.lock().unwrap_or_else(PoisonError::into_inner);
        let index = waits.len();
        waits.push(duration);

        if self.cancel_at == Some(index) {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
