//! Delayed, non-blocking scheduling of command pipelines.
//!
//! Each accepted command is parked for a random delay drawn from the
//! configured window and then processed on its own task. Nothing here blocks
//! the request that scheduled it.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::config::DelayWindow;
use super::processor::{CommandJob, CommandProcessor};

/// What shutdown does with commands still waiting out their delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Drop commands whose delay has not elapsed. Pipelines already running
    /// finish normally.
    #[default]
    Abandon,
    /// Let every scheduled command run to completion.
    Drain,
}

impl FromStr for DrainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abandon" => Ok(Self::Abandon),
            "drain" => Ok(Self::Drain),
            other => Err(format!("unknown drain policy: {other}")),
        }
    }
}

impl std::fmt::Display for DrainPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Abandon => "abandon",
            Self::Drain => "drain",
        })
    }
}

/// Schedules [`CommandJob`]s on independent delayed tasks.
pub struct CommandDispatcher {
    processor: Arc<CommandProcessor>,
    delay: DelayWindow,
    drain_policy: DrainPolicy,
    drain_timeout: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
    scheduled: AtomicU64,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(
        processor: Arc<CommandProcessor>,
        delay: DelayWindow,
        drain_policy: DrainPolicy,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            processor,
            delay,
            drain_policy,
            drain_timeout,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            scheduled: AtomicU64::new(0),
        }
    }

    /// Schedules `job` after a delay drawn from the window and returns that
    /// delay. Returns `None` once shutdown has begun.
    pub fn schedule(&self, job: CommandJob) -> Option<Duration> {
        if self.tracker.is_closed() {
            warn!(corr = %job.ctx.correlator, "dispatcher is shutting down, command dropped");
            return None;
        }

        let delay = self.delay.sample(&mut rand::rng());
        let processor = Arc::clone(&self.processor);
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(
                        corr = %job.ctx.correlator,
                        entity = %job.command.entity.id,
                        "pending command abandoned at shutdown"
                    );
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            processor.process(&job).await;
        });

        self.scheduled.fetch_add(1, Ordering::Relaxed);
        debug!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "command scheduled");
        Some(delay)
    }

    /// Jobs waiting out their delay or running their pipeline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Jobs scheduled since startup.
    #[must_use]
    pub fn scheduled_total(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Stops accepting jobs and applies the configured drain policy.
    pub async fn shutdown(&self) -> bool {
        self.shutdown_with(self.drain_policy, self.drain_timeout).await
    }

    /// Stops accepting jobs, applies `policy` and waits up to `timeout` for
    /// the remaining tasks. Returns `true` if every task finished in time.
    pub async fn shutdown_with(&self, policy: DrainPolicy, timeout: Duration) -> bool {
        self.tracker.close();
        info!(
            policy = %policy,
            pending = self.pending(),
            scheduled = self.scheduled_total(),
            "shutting down command dispatcher"
        );

        if policy == DrainPolicy::Abandon {
            self.cancel.cancel();
        }

        let drained = tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok();
        if !drained {
            warn!(remaining = self.pending(), "command dispatcher drain timed out");
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use hcp_core::command::{SAFETY_INTERLOCK, SAFETY_INTERLOCK_DUAL};
    use serde_json::json;

    use super::*;
    use crate::service::processor::tests::{job, CallLog, FakeBroker, FakeIdentity};
    use crate::traits::{ContextBroker, IdentityProvider};

    fn dispatcher(min_ms: u64, max_ms: u64, calls: &CallLog) -> CommandDispatcher {
        let identity: Arc<dyn IdentityProvider> = Arc::new(FakeIdentity {
            calls: Arc::clone(calls),
            fail: false,
        });
        let broker: Arc<dyn ContextBroker> =
            Arc::new(FakeBroker::new(Arc::clone(calls), Some(json!("1"))));
        let (window, _) = DelayWindow::new(min_ms, max_ms);
        CommandDispatcher::new(
            Arc::new(CommandProcessor::new(identity, broker)),
            window,
            DrainPolicy::Abandon,
            Duration::from_secs(30),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn command_runs_only_after_delay() {
        let calls = CallLog::default();
        let dispatcher = dispatcher(3000, 5000, &calls);

        let delay = dispatcher
            .schedule(job(SAFETY_INTERLOCK_DUAL, json!("1")))
            .unwrap();
        assert!(delay >= Duration::from_millis(3000) && delay <= Duration::from_millis(5000));
        assert_eq!(dispatcher.pending(), 1);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(calls.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(2002)).await;
        assert_eq!(calls.lock().len(), 3);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(dispatcher.scheduled_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_run_concurrently() {
        let calls = CallLog::default();
        let dispatcher = dispatcher(1000, 1000, &calls);

        for _ in 0..5 {
            dispatcher.schedule(job(SAFETY_INTERLOCK, json!("0")));
        }
        assert_eq!(dispatcher.pending(), 5);

        // All five share the same delay, so they finish together.
        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(dispatcher.pending(), 0);
        let auths = calls.lock().iter().filter(|c| c.starts_with("auth")).count();
        assert_eq!(auths, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_drops_pending_commands() {
        let calls = CallLog::default();
        let dispatcher = dispatcher(3000, 3000, &calls);
        dispatcher.schedule(job(SAFETY_INTERLOCK_DUAL, json!("1")));

        assert!(dispatcher.shutdown().await);
        assert!(calls.lock().is_empty());
        assert!(dispatcher.schedule(job(SAFETY_INTERLOCK_DUAL, json!("1"))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_runs_pending_commands() {
        let calls = CallLog::default();
        let dispatcher = dispatcher(3000, 3000, &calls);
        dispatcher.schedule(job(SAFETY_INTERLOCK_DUAL, json!("0")));

        assert!(
            dispatcher
                .shutdown_with(DrainPolicy::Drain, Duration::from_secs(10))
                .await
        );
        assert_eq!(calls.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_timeout() {
        let calls = CallLog::default();
        let dispatcher = dispatcher(60_000, 60_000, &calls);
        dispatcher.schedule(job(SAFETY_INTERLOCK_DUAL, json!("0")));

        assert!(
            !dispatcher
                .shutdown_with(DrainPolicy::Drain, Duration::from_secs(1))
                .await
        );
        assert_eq!(dispatcher.pending(), 1);
    }

    #[test]
    fn drain_policy_parses_case_insensitively() {
        assert_eq!("Drain".parse::<DrainPolicy>(), Ok(DrainPolicy::Drain));
        assert_eq!("abandon".parse::<DrainPolicy>(), Ok(DrainPolicy::Abandon));
        assert!("later".parse::<DrainPolicy>().is_err());
    }
}
