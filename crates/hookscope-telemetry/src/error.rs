//! Telemetry errors.

/// Failure to configure or install logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A level, directive, or format string did not parse.
    #[error("invalid logging config: {0}")]
    Config(String),

    /// The subscriber or file appender could not be installed.
    #[error("failed to initialize logging: {0}")]
    Init(String),

    /// The log directory could not be created.
    #[error("log directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
