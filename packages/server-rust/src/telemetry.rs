//! Structured logging with a runtime-adjustable level.
//!
//! The global subscriber filters through a reloadable `EnvFilter`, so the
//! admin endpoint can change verbosity without a restart.

use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as fmt_layer, reload, EnvFilter, Registry};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to install the global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to reload the log filter: {0}")]
    Reload(#[from] reload::Error),
}

// ---------------------------------------------------------------------------
// Level and format
// ---------------------------------------------------------------------------

/// Operator-facing log levels. `FATAL` has no tracing counterpart and
/// filters like `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Fatal | Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::new(self.directive())
    }
}

impl FromStr for LogLevel {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FATAL" => Ok(Self::Fatal),
            "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            _ => Err(TelemetryError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line, human-oriented.
    Pretty,
    /// Single-line text.
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "dev" => Ok(Self::Pretty),
            "compact" | "pipe" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        })
    }
}

// ---------------------------------------------------------------------------
// LogControl
// ---------------------------------------------------------------------------

/// Handle over the active log level.
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    level: RwLock<LogLevel>,
}

impl LogControl {
    /// A control not attached to any subscriber. Level changes are recorded
    /// but filter nothing; used when logging is owned elsewhere (tests).
    #[must_use]
    pub fn detached(level: LogLevel) -> Self {
        Self {
            handle: None,
            level: RwLock::new(level),
        }
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    /// Applies `level` to the live filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber owning the filter is gone.
    pub fn set_level(&self, level: LogLevel) -> Result<(), TelemetryError> {
        let mut current = self.level.write();
        if let Some(handle) = &self.handle {
            handle.reload(level.filter())?;
        }
        *current = level;
        Ok(())
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(format: LogFormat, level: LogLevel) -> Result<LogControl, TelemetryError> {
    let (filter, handle) = reload::Layer::new(level.filter());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt_layer::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt_layer::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt_layer::layer().compact()).try_init()?,
    }

    Ok(LogControl {
        handle: Some(handle),
        level: RwLock::new(level),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_levels() {
        assert_eq!("fatal".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!(matches!(
            "TRACE".parse::<LogLevel>(),
            Err(TelemetryError::InvalidLevel(level)) if level == "TRACE"
        ));
    }

    #[test]
    fn fatal_filters_like_error() {
        assert_eq!(LogLevel::Fatal.directive(), LogLevel::Error.directive());
    }

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("dev".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("pipe".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn detached_control_tracks_level() {
        let control = LogControl::detached(LogLevel::Info);
        control.set_level(LogLevel::Debug).unwrap();
        assert_eq!(control.level(), LogLevel::Debug);
        assert_eq!(control.level().to_string(), "DEBUG");
    }
}
