//! HTTP middleware stack for the HCP listener.
//!
//! Layers follow the outer-to-inner convention: the first layer listed is
//! the outermost (sees the request first and the response last).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use hcp_core::context::{CORRELATOR_HEADER, REAL_IP_HEADER, SERVICE_HEADER, SERVICE_PATH_HEADER};
use hcp_core::{CorrelationContext, Tenant};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::config::NetworkConfig;
use crate::service::RequestStats;

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    TimeoutLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Identity,
        >,
    >,
>;

/// Builds the transport-level middleware stack.
///
/// 1. `Tracing` -- request/response trace spans
/// 2. `CORS` -- origins from configuration
/// 3. `Timeout` -- 408 after `request_timeout`
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .into_inner()
}

/// A wildcard `"*"` allows any origin; otherwise each entry is parsed into
/// an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the tenant headers. `None` unless both are present and non-empty.
#[must_use]
pub fn tenant_from_headers(headers: &HeaderMap) -> Option<Tenant> {
    Some(Tenant::new(
        header_str(headers, SERVICE_HEADER)?,
        header_str(headers, SERVICE_PATH_HEADER)?,
    ))
}

/// Builds the request's [`CorrelationContext`], stores it in the request
/// extensions, counts the request and echoes the correlator on the response.
pub async fn correlate(
    State(stats): State<Arc<RequestStats>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let ctx = CorrelationContext::for_request(
        header_str(headers, CORRELATOR_HEADER),
        Uuid::new_v4().to_string(),
        request.method().as_str(),
        tenant_from_headers(headers),
        header_str(headers, REAL_IP_HEADER),
    );
    stats.record();

    let correlator = HeaderValue::from_str(&ctx.correlator).ok();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Some(value) = correlator {
        response.headers_mut().insert(CORRELATOR_HEADER, value);
    }
    response
}
