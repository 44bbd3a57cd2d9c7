//! The delayed command pipeline.
//!
//! One job runs `Authenticating -> [Querying] -> decide -> Updating ->
//! ReportingStatus` against the Identity Manager and the Context Broker.
//! Any failure aborts the job; failures are logged and never reach the
//! caller, who was acknowledged long before the job ran.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use hcp_core::context::COMPONENT;
use hcp_core::{decide_command, Command, CorrelationContext, Decision, NoOpReason, Tenant};
use serde_json::Value;
use tracing::{debug, error, info, info_span, Instrument};

use super::auth::AuthError;
use super::broker::BrokerError;
use crate::traits::{ContextBroker, IdentityProvider};

// ---------------------------------------------------------------------------
// Job, stages and outcomes
// ---------------------------------------------------------------------------

/// Everything a delayed pipeline run needs, captured at acknowledgement time.
#[derive(Debug, Clone)]
pub struct CommandJob {
    pub ctx: CorrelationContext,
    pub tenant: Tenant,
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Authenticating,
    Querying,
    Updating,
    ReportingStatus,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authenticating => "authenticating",
            Self::Querying => "querying",
            Self::Updating => "updating",
            Self::ReportingStatus => "reporting-status",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("power state query failed: {0}")]
    Query(#[source] BrokerError),

    #[error("state update failed: {0}")]
    Update(#[source] BrokerError),
}

impl PipelineError {
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Auth(_) => PipelineStage::Authenticating,
            Self::Query(_) => PipelineStage::Querying,
            Self::Update(_) => PipelineStage::Updating,
        }
    }
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The state update was accepted. `status_reported` tells whether the
    /// follow-up `<command>Status = OK` was accepted too.
    Completed { status_reported: bool },
    /// The decision was a no-op; no state was written.
    NoOp(NoOpReason),
    /// A failure at `stage` stopped the pipeline.
    Aborted { stage: PipelineStage },
}

// ---------------------------------------------------------------------------
// CommandProcessor
// ---------------------------------------------------------------------------

/// Runs one [`CommandJob`] through the pipeline. Holds no per-job state, so a
/// single instance serves every concurrently running job.
pub struct CommandProcessor {
    identity: Arc<dyn IdentityProvider>,
    broker: Arc<dyn ContextBroker>,
}

impl CommandProcessor {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, broker: Arc<dyn ContextBroker>) -> Self {
        Self { identity, broker }
    }

    /// Runs the pipeline to completion inside a span carrying the job's
    /// correlation context. Never fails: errors are logged and folded into
    /// [`PipelineOutcome::Aborted`].
    pub async fn process(&self, job: &CommandJob) -> PipelineOutcome {
        let span = info_span!(
            "command",
            comp = COMPONENT,
            corr = %job.ctx.correlator,
            trans = %job.ctx.transaction,
            op = %job.ctx.operation,
            from = %job.ctx.from,
            srv = %job.tenant.service,
            subsrv = %job.tenant.service_path,
            entity = %job.command.entity.id,
            command = %job.command.attribute_name,
        );

        async {
            match self.run(job).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let stage = e.stage();
                    error!(stage = %stage, error = %e, "command pipeline aborted");
                    PipelineOutcome::Aborted { stage }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &CommandJob) -> Result<PipelineOutcome, PipelineError> {
        let CommandJob {
            ctx,
            tenant,
            command,
        } = job;

        let token = self.identity.request_token(ctx, tenant).await?;
        debug!("token obtained");

        let power_state: Option<Value> = if command.kind.requires_power_state() {
            let value = self
                .broker
                .query_attribute(
                    ctx,
                    tenant,
                    &token,
                    &command.entity,
                    hcp_core::decision::POWER_STATE_GENERAL,
                )
                .await
                .map_err(PipelineError::Query)?;
            debug!(power_state_general = ?value, "power state queried");
            value
        } else {
            None
        };

        let update = match decide_command(command, power_state.as_ref(), Utc::now()) {
            Decision::Update(update) => update,
            Decision::NoOp(reason) => {
                match &reason {
                    NoOpReason::UnrecognizedCommand(name) => {
                        debug!(attribute = %name, "unrecognized command, nothing to do");
                    }
                    NoOpReason::UnrecognizedValue(value) => {
                        debug!(value = %value, "unrecognized command value, nothing to do");
                    }
                    NoOpReason::GeneralPowerOff(value) => {
                        info!(power_state_general = ?value, "general power is off, command ignored");
                    }
                }
                return Ok(PipelineOutcome::NoOp(reason));
            }
        };

        self.broker
            .append_attributes(ctx, tenant, &token, &command.entity, update.attributes())
            .await
            .map_err(PipelineError::Update)?;
        info!(last_command = update.last_command.as_str(), "entity state updated");

        let status_reported = match self
            .broker
            .append_attributes(
                ctx,
                tenant,
                &token,
                &command.entity,
                vec![command.status_attribute()],
            )
            .await
        {
            Ok(()) => {
                debug!("command status reported");
                true
            }
            Err(e) => {
                error!(stage = %PipelineStage::ReportingStatus, error = %e, "command status report failed");
                false
            }
        };

        Ok(PipelineOutcome::Completed { status_reported })
    }
}
