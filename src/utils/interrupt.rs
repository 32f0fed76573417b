//! Interruptible waits.
//!
//! Every pause in the program (retry backoff, the delay between downloads)
//! goes through a [`Sleeper`] so that Ctrl+C can cut it short. What a
//! cancelled wait means is up to the caller: the retry engine gives up on the
//! current operation, the batch downloader stops the whole batch.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// A wait was interrupted by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled by user")]
pub struct Cancelled;

/// Something that can wait for a duration and be interrupted
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Wait for `duration`, or return [`Cancelled`] if interrupted first
    async fn sleep(&self, duration: Duration) -> Result<(), Cancelled>;
}

#[derive(Debug, Default)]
struct InterruptState {
    /// Number of waits currently in progress
    sleeping: AtomicUsize,
    /// Wakes in-progress waits
    wake_sleepers: Notify,
    /// Signalled when Ctrl+C arrives while nothing is waiting
    idle: Notify,
}

/// Ctrl+C aware [`Sleeper`]
///
/// A single background task owns the signal handler. Ctrl+C during a wait
/// cancels that wait; Ctrl+C at any other time resolves
/// [`SignalSleeper::interrupted`], which the binary turns into exit code 130.
#[derive(Debug, Clone)]
pub struct SignalSleeper {
    state: Arc<InterruptState>,
}

impl SignalSleeper {
    /// Install the Ctrl+C listener. Must be called from within a tokio runtime.
    pub fn install() -> Self {
        let state = Arc::new(InterruptState::default());
        let listener = Arc::clone(&state);

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if listener.sleeping.load(Ordering::SeqCst) > 0 {
                    tracing::debug!("Ctrl+C received during a wait");
                    listener.wake_sleepers.notify_waiters();
                } else {
                    listener.idle.notify_one();
                }
            }
        });

        Self { state }
    }

    /// Resolves once Ctrl+C arrives while no wait is in progress
    pub async fn interrupted(&self) {
        self.state.idle.notified().await;
    }
}

#[async_trait]
impl Sleeper for SignalSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let cancelled = self.state.wake_sleepers.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        self.state.sleeping.fetch_add(1, Ordering::SeqCst);
        let result = tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = &mut cancelled => Err(Cancelled),
        };
        self.state.sleeping.fetch_sub(1, Ordering::SeqCst);

        result
    }
}
