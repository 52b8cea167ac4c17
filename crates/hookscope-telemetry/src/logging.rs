//! Subscriber setup.
//!
//! One `fmt` layer, filtered by an [`EnvFilter`] built from the level plus
//! per-crate directives, written to stderr, stdout, or a daily log file.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "hookscope.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, indented.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
    /// One line per event with the full span context.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pretty, Self::Compact, Self::Json, Self::Full]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TelemetryError::Config(format!("unknown log format '{s}'")))
    }
}

impl LogFormat {
    /// The name used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
            Self::Full => "full",
        }
    }
}

/// Where log lines go.
///
/// Stderr is the default so stdout stays free for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Daily-rotated files in a directory.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level (`info`, `debug`, ...).
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Output destination.
    pub target: LogTarget,
    /// Whether lines carry a timestamp.
    pub timestamps: bool,
    /// Extra filter directives (`hookscope_audit=trace`).
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Config at `level` with default format and target.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Set the line format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Log to daily-rotated files under `directory`.
    #[must_use]
    pub fn with_file_logging(mut self, directory: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(directory.into());
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Drop timestamps from every line.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// The level and directives as one filter.
    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let spec = std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::builder()
            .parse(&spec)
            .map_err(|e| TelemetryError::Config(format!("invalid filter '{spec}': {e}")))
    }

    fn layer_for<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
        match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => layer.pretty().boxed(),
            (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
            (LogFormat::Json, true) => layer.json().boxed(),
            (LogFormat::Json, false) => layer.json().without_time().boxed(),
            (LogFormat::Full, true) => layer.boxed(),
            (LogFormat::Full, false) => layer.without_time().boxed(),
        }
    }

    fn build_layer(&self) -> TelemetryResult<BoxedLayer> {
        Ok(match &self.target {
            LogTarget::Stdout => self.layer_for(std::io::stdout, std::io::stdout().is_terminal()),
            LogTarget::Stderr => self.layer_for(std::io::stderr, std::io::stderr().is_terminal()),
            LogTarget::File(dir) => self.layer_for(file_appender(dir)?, false),
        })
    }
}

fn file_appender(dir: &Path) -> TelemetryResult<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter does not parse, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let layer = config.build_layer()?.with_filter(config.filter()?);
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

/// Install an `info`-level compact subscriber on stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_compact_info_on_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.timestamps);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("full".parse::<LogFormat>().unwrap(), LogFormat::Full);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TelemetryError::Config(_))
        ));
    }

    #[test]
    fn directives_join_the_level() {
        let config = LogConfig::new("warn")
            .with_directive("hookscope_audit=trace")
            .with_directive("hookscope_config=debug");
        let filter = config.filter().unwrap().to_string();

        assert!(filter.contains("warn"));
        assert!(filter.contains("hookscope_audit=trace"));
        assert!(filter.contains("hookscope_config=debug"));
    }

    #[test]
    fn malformed_directive_is_rejected() {
        let config = LogConfig::new("debug").with_directive("[unclosed=info");
        assert!(config.filter().is_err());
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(config.directives.is_empty());
    }

    #[test]
    fn file_target_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let config = LogConfig::new("info").with_file_logging(&logs);

        assert!(config.build_layer().is_ok());
        assert!(logs.is_dir());
    }
}
