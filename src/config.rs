//! Client configuration with environment-overridable defaults.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `AI_LIB_ARTIFACT_DIR` | Directory for request body artifacts | `<tmp>/ai-lib-dispatch` |
//! | `AI_LIB_LOG_LEVEL` | Verbosity used by the artifact retention policy | active `tracing` max level |
//! | `AI_PROXY_URL` | Proxy applied to every request | none |

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::transport::TransportPolicy;
use crate::{Error, ErrorContext};

/// Logging verbosity tiers, most restrictive first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The tiers under which successful requests do not keep their artifact.
    pub fn is_restrictive(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Info)
    }

    /// Current max level of the installed `tracing` subscriber.
    /// A disabled subscriber counts as the most restrictive tier.
    pub fn current() -> Self {
        Self::from_level_filter(LevelFilter::current())
    }

    pub fn from_level_filter(filter: LevelFilter) -> Self {
        use tracing::Level;
        match filter.into_level() {
            None => LogLevel::Error,
            Some(l) if l == Level::ERROR => LogLevel::Error,
            Some(l) if l == Level::WARN => LogLevel::Warn,
            Some(l) if l == Level::INFO => LogLevel::Info,
            Some(l) if l == Level::DEBUG => LogLevel::Debug,
            Some(_) => LogLevel::Trace,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(Error::configuration_with_context(
                format!("unknown log level '{}'", other),
                ErrorContext::new()
                    .with_field_path("AI_LIB_LOG_LEVEL")
                    .with_details("expected one of error, warn, info, debug, trace"),
            )),
        }
    }
}

/// Runtime knobs shared by every request of a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub artifact_dir: PathBuf,
    /// Fixed verbosity for the retention policy; `None` follows `tracing` at cleanup time.
    pub log_level: Option<LogLevel>,
    pub proxy: Option<String>,
    pub policy: TransportPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            log_level: None,
            proxy: None,
            policy: TransportPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `AI_LIB_*` / `AI_PROXY_URL` variables when set.
    /// An unparsable `AI_LIB_LOG_LEVEL` is ignored with a warning.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = env::var("AI_LIB_ARTIFACT_DIR") {
            if !dir.trim().is_empty() {
                cfg.artifact_dir = PathBuf::from(dir);
            }
        }
        if let Ok(level) = env::var("AI_LIB_LOG_LEVEL") {
            match level.parse::<LogLevel>() {
                Ok(l) => cfg.log_level = Some(l),
                Err(e) => tracing::warn!(%e, "ignoring AI_LIB_LOG_LEVEL"),
            }
        }
        cfg.proxy = env::var("AI_PROXY_URL").ok().filter(|s| !s.trim().is_empty());
        cfg
    }

    /// Verbosity the retention policy should apply right now.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_else(LogLevel::current)
    }
}

fn default_artifact_dir() -> PathBuf {
    env::temp_dir().join("ai-lib-dispatch")
}
