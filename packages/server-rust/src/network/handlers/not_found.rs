use axum::http::{Method, Uri};
use axum::Extension;
use hcp_core::CorrelationContext;
use tracing::warn;

use crate::network::error::ApiError;

/// Fallback for unknown paths and for known paths with an unsupported
/// method. Both answer 404.
pub async fn not_found_handler(
    Extension(ctx): Extension<CorrelationContext>,
    method: Method,
    uri: Uri,
) -> ApiError {
    warn!(corr = %ctx.correlator, method = %method, uri = %uri, "no route for request");
    ApiError::NotFound
}
