//! Poll scheduler — the loop's only intentional suspension point.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Elapsed,
    Cancelled,
}

/// Sleeps between polls, waking early when the session is cancelled.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub async fn wait(&self, interval: Duration) -> WaitResult {
        debug!(secs = interval.as_secs(), "Waiting before next poll");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WaitResult::Cancelled,
            _ = tokio::time::sleep(interval) => WaitResult::Elapsed,
        }
    }
}
