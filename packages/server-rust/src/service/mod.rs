//! Command actuation service.
//!
//! 1. **Identity** (`auth`): tenant-scoped tokens from the Identity Manager
//! 2. **Context Broker** (`broker`): NGSI v1 query and append
//! 3. **Pipeline** (`processor`): authenticate, query, decide, update, report
//! 4. **Scheduling** (`dispatcher`): random delay, one task per command
//! 5. **Background workers** (`worker`, `proof_of_life`): periodic KPI line

pub mod auth;
pub mod broker;
pub mod config;
pub mod dispatcher;
pub mod processor;
pub mod proof_of_life;
pub mod worker;

use std::sync::Arc;

pub use auth::{AuthError, AuthToken, KeystoneClient};
pub use broker::{BrokerError, ContextBrokerClient};
pub use config::{DelayWindow, Endpoint, IdentityConfig, ServiceConfig};
pub use dispatcher::{CommandDispatcher, DrainPolicy};
pub use processor::{CommandJob, CommandProcessor, PipelineError, PipelineOutcome, PipelineStage};
pub use proof_of_life::{ProofOfLife, RequestStats};
pub use worker::{BackgroundRunnable, BackgroundWorker};

/// Wires the HTTP clients, the pipeline and the dispatcher from `config`.
///
/// # Errors
///
/// Returns an error if the shared HTTP client cannot be built (e.g. the TLS
/// backend fails to initialise).
pub fn build_dispatcher(config: &ServiceConfig) -> Result<CommandDispatcher, reqwest::Error> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;

    let identity = Arc::new(KeystoneClient::new(http.clone(), &config.identity));
    let broker = Arc::new(ContextBrokerClient::new(http, &config.context_broker));
    let processor = Arc::new(CommandProcessor::new(identity, broker));

    Ok(CommandDispatcher::new(
        processor,
        config.delay,
        config.drain_policy,
        config.drain_timeout,
    ))
}
