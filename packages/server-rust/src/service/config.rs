use std::fmt;
use std::time::Duration;

use rand::Rng;

use super::dispatcher::DrainPolicy;

/// `protocol://host:port` of a downstream HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Inclusive `[min, max]` window, in milliseconds, from which each command's
/// actuation delay is drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    min_ms: u64,
    max_ms: u64,
}

impl DelayWindow {
    /// Builds a window. A window with `min > max` collapses to `min`; the
    /// returned flag is `true` when that happened.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> (Self, bool) {
        if min_ms > max_ms {
            (Self { min_ms, max_ms: min_ms }, true)
        } else {
            (Self { min_ms, max_ms }, false)
        }
    }

    #[must_use]
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    #[must_use]
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Draws a delay uniformly from the window, bounds included.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for DelayWindow {
    fn default() -> Self {
        Self {
            min_ms: 3000,
            max_ms: 5000,
        }
    }
}

/// Identity Manager endpoint and the fixed credentials this system
/// authenticates with.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub endpoint: Endpoint,
    pub user: String,
    pub password: String,
    /// Domain owning the scoped project. `None` scopes the project to the
    /// tenant service's own domain.
    pub project_domain: Option<String>,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"***")
            .field("project_domain", &self.project_domain)
            .finish()
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("https", "localhost", 5001),
            user: "user".to_string(),
            password: "password".to_string(),
            project_domain: None,
        }
    }
}

/// Configuration of the delayed command pipeline and its outbound clients.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Actuation delay window.
    pub delay: DelayWindow,
    /// Context Broker endpoint.
    pub context_broker: Endpoint,
    /// Identity Manager endpoint and credentials.
    pub identity: IdentityConfig,
    /// Timeout applied to every outbound HTTP request.
    pub request_timeout: Duration,
    /// Accept self-signed / invalid TLS certificates on outbound calls.
    pub accept_invalid_certs: bool,
    /// What happens to commands still waiting out their delay at shutdown.
    pub drain_policy: DrainPolicy,
    /// Upper bound on how long shutdown waits for pipelines to finish.
    pub drain_timeout: Duration,
    /// Interval between proof-of-life log lines.
    pub proof_of_life_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            delay: DelayWindow::default(),
            context_broker: Endpoint::new("https", "localhost", 1026),
            identity: IdentityConfig::default(),
            request_timeout: Duration::from_secs(10),
            accept_invalid_certs: true,
            drain_policy: DrainPolicy::Abandon,
            drain_timeout: Duration::from_secs(30),
            proof_of_life_interval: Duration::from_secs(60),
        }
    }
}
