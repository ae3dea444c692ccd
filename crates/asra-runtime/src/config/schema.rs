//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use asra_framework::{DEFAULT_HANDLER_PATTERN, EmbedColors};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AsraConfig {
    /// Where handler definition files live.
    #[serde(default)]
    pub events: EventsConfig,

    /// Which environment variables hold the login token.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Embed colour palette.
    #[serde(default)]
    pub embed: EmbedColors,
}

// =============================================================================
// Events
// =============================================================================

/// Handler discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Directory holding client event handler files.
    #[serde(default = "default_client_dir")]
    pub client_dir: PathBuf,

    /// Directory holding transport event handler files.
    #[serde(default = "default_transport_dir")]
    pub transport_dir: PathBuf,

    /// Glob matched against file names inside both directories.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            client_dir: default_client_dir(),
            transport_dir: default_transport_dir(),
            pattern: default_pattern(),
        }
    }
}

fn default_client_dir() -> PathBuf {
    PathBuf::from("events/client")
}

fn default_transport_dir() -> PathBuf {
    PathBuf::from("events/transport")
}

fn default_pattern() -> String {
    DEFAULT_HANDLER_PATTERN.to_string()
}

// =============================================================================
// Credentials
// =============================================================================

/// Names of the environment variables consulted at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Variable selecting the deployment mode.
    #[serde(default = "default_mode_var")]
    pub mode_var: String,

    /// Token variable used in production mode.
    #[serde(default = "default_production_var")]
    pub production_var: String,

    /// Token variable used in every other mode.
    #[serde(default = "default_development_var")]
    pub development_var: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            mode_var: default_mode_var(),
            production_var: default_production_var(),
            development_var: default_development_var(),
        }
    }
}

fn default_mode_var() -> String {
    "ENVIRONMENT".to_string()
}

fn default_production_var() -> String {
    "PRODUCTION_TOKEN".to_string()
}

fn default_development_var() -> String {
    "DEVELOPMENT_TOKEN".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LoggingLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rotation of the log file.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files kept on disk. `0` keeps all of them.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `asra_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LoggingLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LoggingLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> usize {
    5
}

/// Level of the `tracing` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LoggingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}
