//! Layered startup configuration.
//!
//! Every setting resolves independently: environment variable first, then
//! the optional TOML file, then the built-in default. The source each value
//! came from is recorded so it can be logged once logging is up.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::network::NetworkConfig;
use crate::service::{DelayWindow, DrainPolicy, Endpoint, IdentityConfig, ServiceConfig};
use crate::telemetry::{LogFormat, LogLevel};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Contents of the TOML config file. Every field is optional; absent
/// fields fall through to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub context_broker: EndpointSection,
    pub auth: AuthSection,
    pub logging: LoggingSection,
    pub http: HttpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub delay: DelaySection,
    pub shutdown_policy: Option<String>,
    pub drain_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DelaySection {
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EndpointSection {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub project_domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub proof_of_life_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub request_timeout_ms: Option<u64>,
    pub accept_invalid_certs: Option<bool>,
}

/// Loads a TOML config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`FileConfig`].
pub fn load_from_file(path: impl AsRef<Path>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env,
    File,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Env => "environment",
            Self::File => "config file",
            Self::Default => "default",
        })
    }
}

/// One resolved setting, for the startup report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub key: &'static str,
    pub value: String,
    pub source: Source,
}

/// Logging settings needed before anything else starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub network: NetworkConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    /// Where each setting came from, in resolution order.
    pub report: Vec<ResolvedSetting>,
    /// Adjustments made while resolving (e.g. an inverted delay window).
    pub warnings: Vec<String>,
}

struct Resolver<'a, E> {
    env: E,
    report: &'a mut Vec<ResolvedSetting>,
}

impl<E: Fn(&str) -> Option<String>> Resolver<'_, E> {
    /// Env wins if it parses, then the file value, then `default`.
    fn value<T: FromStr + fmt::Display>(
        &mut self,
        key: &'static str,
        env_key: &str,
        file: Option<T>,
        default: T,
        secret: bool,
    ) -> T {
        let (value, source) = match (self.env)(env_key).and_then(|raw| raw.trim().parse().ok()) {
            Some(v) => (v, Source::Env),
            None => match file {
                Some(v) => (v, Source::File),
                None => (default, Source::Default),
            },
        };
        self.report.push(ResolvedSetting {
            key,
            value: if secret { "***".to_string() } else { value.to_string() },
            source,
        });
        value
    }

    fn plain<T: FromStr + fmt::Display>(
        &mut self,
        key: &'static str,
        env_key: &str,
        file: Option<T>,
        default: T,
    ) -> T {
        self.value(key, env_key, file, default, false)
    }
}

/// `Option<String>` from the file parsed into `T`; unparseable values are
/// treated as absent.
fn parsed<T: FromStr>(raw: Option<&String>) -> Option<T> {
    raw.and_then(|s| s.parse().ok())
}

impl Settings {
    /// Resolves against the process environment.
    #[must_use]
    pub fn from_env(file: &FileConfig) -> Self {
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Resolves every setting from `env`, then `file`, then defaults.
    #[must_use]
    pub fn resolve(file: &FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut report = Vec::new();
        let mut warnings = Vec::new();
        let net_defaults = NetworkConfig::default();
        let svc_defaults = ServiceConfig::default();
        let id_defaults = IdentityConfig::default();
        let mut r = Resolver {
            env,
            report: &mut report,
        };

        let host = r.plain("server.host", "HCP_HOST", file.server.host.clone(), net_defaults.host.clone());
        let port = r.plain("server.port", "HCP_PORT", file.server.port, net_defaults.port);

        let min_ms = r.plain(
            "server.delay.minimum",
            "HCP_DELAY_MINIMUM",
            file.server.delay.minimum,
            svc_defaults.delay.min_ms(),
        );
        let max_ms = r.plain(
            "server.delay.maximum",
            "HCP_DELAY_MAXIMUM",
            file.server.delay.maximum,
            svc_defaults.delay.max_ms(),
        );
        let (delay, collapsed) = DelayWindow::new(min_ms, max_ms);
        if collapsed {
            warnings.push(format!(
                "delay minimum {min_ms}ms exceeds maximum {max_ms}ms; using a fixed {min_ms}ms delay"
            ));
        }

        let drain_policy: DrainPolicy = r.plain(
            "server.shutdown_policy",
            "HCP_SHUTDOWN_POLICY",
            parsed(file.server.shutdown_policy.as_ref()),
            svc_defaults.drain_policy,
        );
        let drain_timeout_ms = r.plain(
            "server.drain_timeout_ms",
            "HCP_DRAIN_TIMEOUT_MS",
            file.server.drain_timeout_ms,
            duration_ms(svc_defaults.drain_timeout),
        );

        let cb = &file.context_broker;
        let cb_defaults = &svc_defaults.context_broker;
        let context_broker = Endpoint::new(
            r.plain(
                "context_broker.protocol",
                "HCP_CONTEXT_BROKER_PROTOCOL",
                cb.protocol.clone(),
                cb_defaults.protocol.clone(),
            ),
            r.plain(
                "context_broker.host",
                "HCP_CONTEXT_BROKER_HOST",
                cb.host.clone(),
                cb_defaults.host.clone(),
            ),
            r.plain("context_broker.port", "HCP_CONTEXT_BROKER_PORT", cb.port, cb_defaults.port),
        );

        let auth = &file.auth;
        let auth_endpoint = Endpoint::new(
            r.plain(
                "auth.protocol",
                "HCP_AUTH_PROTOCOL",
                auth.protocol.clone(),
                id_defaults.endpoint.protocol.clone(),
            ),
            r.plain("auth.host", "HCP_AUTH_HOST", auth.host.clone(), id_defaults.endpoint.host.clone()),
            r.plain("auth.port", "HCP_AUTH_PORT", auth.port, id_defaults.endpoint.port),
        );
        let user = r.plain("auth.user", "HCP_AUTH_USER", auth.user.clone(), id_defaults.user.clone());
        let password = r.value(
            "auth.password",
            "HCP_AUTH_PASSWORD",
            auth.password.clone(),
            id_defaults.password.clone(),
            true,
        );
        let project_domain = r.plain(
            "auth.project_domain",
            "HCP_AUTH_PROJECT_DOMAIN",
            auth.project_domain.clone(),
            String::new(),
        );

        let level = r.plain(
            "logging.level",
            "HCP_LOG_LEVEL",
            parsed(file.logging.level.as_ref()),
            LogLevel::Info,
        );
        let format = r.plain(
            "logging.format",
            "HCP_LOG_FORMAT",
            parsed(file.logging.format.as_ref()),
            LogFormat::Compact,
        );
        let proof_of_life_secs = r.plain(
            "logging.proof_of_life_interval",
            "PROOF_OF_LIFE_INTERVAL",
            file.logging.proof_of_life_interval,
            svc_defaults.proof_of_life_interval.as_secs(),
        );

        let request_timeout_ms = r.plain(
            "http.request_timeout_ms",
            "HCP_HTTP_REQUEST_TIMEOUT_MS",
            file.http.request_timeout_ms,
            duration_ms(svc_defaults.request_timeout),
        );
        let accept_invalid_certs = r.plain(
            "http.accept_invalid_certs",
            "HCP_HTTP_ACCEPT_INVALID_CERTS",
            file.http.accept_invalid_certs,
            svc_defaults.accept_invalid_certs,
        );

        Self {
            network: NetworkConfig {
                host,
                port,
                ..net_defaults
            },
            service: ServiceConfig {
                delay,
                context_broker,
                identity: IdentityConfig {
                    endpoint: auth_endpoint,
                    user,
                    password,
                    project_domain: Some(project_domain).filter(|d| !d.is_empty()),
                },
                request_timeout: Duration::from_millis(request_timeout_ms),
                accept_invalid_certs,
                drain_policy,
                drain_timeout: Duration::from_millis(drain_timeout_ms),
                proof_of_life_interval: Duration::from_secs(proof_of_life_secs.max(1)),
            },
            logging: LoggingConfig { level, format },
            report,
            warnings,
        }
    }

    /// Logs where every setting came from. Defaults are logged at `warn` so
    /// an unconfigured deployment stands out.
    pub fn log_report(&self) {
        for setting in &self.report {
            match setting.source {
                Source::Default => warn!(
                    setting = setting.key,
                    value = %setting.value,
                    "setting not configured, using default"
                ),
                source => info!(
                    setting = setting.key,
                    value = %setting.value,
                    source = %source,
                    "setting configured"
                ),
            }
        }
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
