//! Per-request tenancy and correlation context.

use std::fmt;

/// Component tag attached to every log context.
pub const COMPONENT: &str = "HCP";

/// Placeholder for context fields that are unknown (e.g. no `x-real-ip`).
pub const NOT_AVAILABLE: &str = "n/a";

/// Prefix for per-request operation types, e.g. `OPER_HCP_POST`.
pub const OPERATION_TYPE_PREFIX: &str = "OPER_HCP_";

/// Tenant service header.
pub const SERVICE_HEADER: &str = "fiware-service";

/// Tenant service-path header.
pub const SERVICE_PATH_HEADER: &str = "fiware-servicepath";

/// Correlation id header, accepted inbound and echoed outbound.
pub const CORRELATOR_HEADER: &str = "fiware-correlator";

/// Origin address set by the fronting proxy.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// A `(service, service-path)` pair scoping authentication and every
/// downstream call. Immutable per request; never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant {
    pub service: String,
    pub service_path: String,
}

impl Tenant {
    #[must_use]
    pub fn new(service: impl Into<String>, service_path: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            service_path: service_path.into(),
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.service, self.service_path)
    }
}

/// Per-request traceability context, created at ingress and threaded through
/// every downstream call and log line of the request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    /// Inbound `fiware-correlator`, or the transaction id when absent.
    pub correlator: String,
    /// Always freshly generated for the request.
    pub transaction: String,
    /// Operation type, e.g. `OPER_HCP_POST`.
    pub operation: String,
    /// Tenant headers, when both were supplied.
    pub tenant: Option<Tenant>,
    /// Origin address (`x-real-ip`) or [`NOT_AVAILABLE`].
    pub from: String,
}

impl CorrelationContext {
    /// Builds a context for an inbound request.
    ///
    /// `transaction` must be a fresh identifier; it doubles as the
    /// correlator when the caller did not supply one.
    #[must_use]
    pub fn for_request(
        correlator: Option<String>,
        transaction: String,
        method: &str,
        tenant: Option<Tenant>,
        from: Option<String>,
    ) -> Self {
        Self {
            correlator: correlator.unwrap_or_else(|| transaction.clone()),
            transaction,
            operation: format!("{OPERATION_TYPE_PREFIX}{}", method.to_uppercase()),
            tenant,
            from: from.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// Tenant service for logging, or [`NOT_AVAILABLE`].
    #[must_use]
    pub fn service(&self) -> &str {
        self.tenant.as_ref().map_or(NOT_AVAILABLE, |t| t.service.as_str())
    }

    /// Tenant service path for logging, or [`NOT_AVAILABLE`].
    #[must_use]
    pub fn service_path(&self) -> &str {
        self.tenant
            .as_ref()
            .map_or(NOT_AVAILABLE, |t| t.service_path.as_str())
    }
}
