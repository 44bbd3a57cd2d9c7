//! Periodic "still alive" KPI line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::worker::BackgroundRunnable;

/// Requests attended since the last report. Shared between the ingress
/// middleware, which increments it, and the reporter, which drains it.
#[derive(Debug, Default)]
pub struct RequestStats {
    attended: AtomicU64,
}

impl RequestStats {
    pub fn record(&self) {
        self.attended.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the count and resets it to zero.
    pub fn take(&self) -> u64 {
        self.attended.swap(0, Ordering::Relaxed)
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.attended.load(Ordering::Relaxed)
    }
}

/// Logs the number of requests attended in each interval, then resets it.
pub struct ProofOfLife {
    stats: Arc<RequestStats>,
    interval: Duration,
}

impl ProofOfLife {
    #[must_use]
    pub fn new(stats: Arc<RequestStats>, interval: Duration) -> Self {
        Self { stats, interval }
    }

    fn report(&self) -> u64 {
        let attended = self.stats.take();
        info!(
            "Everything OK, {attended} requests attended in the last {}s interval",
            self.interval.as_secs()
        );
        attended
    }
}

#[async_trait]
impl BackgroundRunnable for ProofOfLife {
    async fn on_tick(&mut self) {
        self.report();
    }
}
