//! HTTP handler definitions for the HCP listener.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handlers used to build the router.

pub mod admin;
pub mod not_found;
pub mod update_context;
pub mod version;

pub use admin::{get_log_level_handler, set_log_level_handler};
pub use not_found::not_found_handler;
pub use update_context::{update_context_handler, TenantHeaders};
pub use version::version_handler;

use std::sync::Arc;

use crate::service::{CommandDispatcher, RequestStats};
use crate::telemetry::LogControl;

/// Shared application state passed to all axum handlers via `State`
/// extraction. Holds `Arc`s so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Schedules accepted commands onto delayed pipelines.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Live log level, read and changed by the admin endpoints.
    pub log: Arc<LogControl>,
    /// Requests attended since the last proof-of-life report.
    pub stats: Arc<RequestStats>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::AppState;
    use crate::service::processor::tests::{CallLog, FakeBroker, FakeIdentity};
    use crate::service::{CommandDispatcher, CommandProcessor, DelayWindow, DrainPolicy, RequestStats};
    use crate::telemetry::{LogControl, LogLevel};
    use crate::traits::{ContextBroker, IdentityProvider};

    /// State wired to recording fakes with a 1 s actuation delay.
    pub(crate) fn test_state(calls: &CallLog) -> AppState {
        let identity: Arc<dyn IdentityProvider> = Arc::new(FakeIdentity {
            calls: Arc::clone(calls),
            fail: false,
        });
        let broker: Arc<dyn ContextBroker> =
            Arc::new(FakeBroker::new(Arc::clone(calls), Some(json!("1"))));
        let (window, _) = DelayWindow::new(1000, 1000);
        AppState {
            dispatcher: Arc::new(CommandDispatcher::new(
                Arc::new(CommandProcessor::new(identity, broker)),
                window,
                DrainPolicy::Abandon,
                Duration::from_secs(5),
            )),
            log: Arc::new(LogControl::detached(LogLevel::Info)),
            stats: Arc::new(RequestStats::default()),
        }
    }
}
