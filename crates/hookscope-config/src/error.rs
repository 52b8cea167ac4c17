//! Configuration errors.

use std::path::PathBuf;

/// Why a configuration could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file passed with `--config` does not exist.
    #[error("config file {} not found", .path.display())]
    MissingExplicit {
        /// The requested file.
        path: PathBuf,
    },

    /// A config file is larger than the loader accepts.
    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    TooLarge {
        /// The file.
        path: PathBuf,
        /// Its size.
        size: u64,
        /// The limit.
        limit: u64,
    },

    /// TOML did not parse or did not fit the schema.
    #[error("invalid TOML in {origin}: {source}")]
    Parse {
        /// File path, or a marker for the embedded defaults / merged result.
        origin: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is not acceptable.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted field path (`trace.max_output_bytes`).
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A `HOOKSCOPE_*` variable could not be converted.
    #[error("environment variable {var}: {message}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// No home directory to look for the user config in.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
