//! `POST /v1/updateContext`: inbound command notifications.
//!
//! The caller gets the protocol acknowledgement right away; the command
//! itself runs later on a delayed pipeline whose result the caller never
//! sees.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::{Extension, Json};
use hcp_core::context::{SERVICE_HEADER, SERVICE_PATH_HEADER};
use hcp_core::{Command, ContextResponseEnvelope, CorrelationContext, Tenant, UpdateContextRequest};
use tracing::{debug, info, warn};

use super::AppState;
use crate::network::error::ApiError;
use crate::service::CommandJob;

/// Extracts the mandatory tenant headers, rejecting the request with a 400
/// naming the first missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantHeaders(pub Tenant);

fn required(parts: &Parts, name: &'static str) -> Result<String, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingHeader(name))
}

impl<S: Send + Sync> FromRequestParts<S> for TenantHeaders {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let parts: &Parts = parts;
        required(parts, SERVICE_HEADER)
            .and_then(|service| {
                required(parts, SERVICE_PATH_HEADER).map(|path| Self(Tenant::new(service, path)))
            })
            .inspect_err(|e| warn!(uri = %parts.uri, error = %e, "rejecting request without tenant headers"))
    }
}

pub async fn update_context_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<CorrelationContext>,
    TenantHeaders(tenant): TenantHeaders,
    payload: Result<Json<UpdateContextRequest>, JsonRejection>,
) -> Result<Json<ContextResponseEnvelope>, ApiError> {
    let Json(payload) = payload.inspect_err(|e| {
        warn!(corr = %ctx.correlator, error = %e, "rejecting malformed updateContext payload");
    })?;
    debug!(corr = %ctx.correlator, tenant = %tenant, payload = ?payload, "updateContext received");

    match Command::from_update(&payload) {
        Some(command) => {
            info!(
                corr = %ctx.correlator,
                entity = %command.entity.id,
                command = %command.attribute_name,
                "command accepted"
            );
            let job = CommandJob {
                ctx,
                tenant,
                command,
            };
            state.dispatcher.schedule(job);
        }
        None => debug!(corr = %ctx.correlator, "no command attribute in payload, nothing scheduled"),
    }

    Ok(Json(payload.acknowledgement()))
}
