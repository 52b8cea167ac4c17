//! Configuration types for hookscope.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default output ceiling for a traced hook's stdout and stderr (50 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 50 * 1024 * 1024;

/// Default per-record string dump limit passed to the tracer.
pub const DEFAULT_STRING_LIMIT: usize = 8192;

/// Default pattern for the install summary line.
///
/// Matches `added N packages from`, npm 7+'s `added N packages in` and
/// `added N packages, and audited`, and `up to date` when nothing was added.
pub const DEFAULT_SUMMARY_PATTERN: &str = r"added (\d+) packages?(?: from|,| in)|up to date";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for hookscope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External programs the pipeline shells out to.
    pub tools: ToolsSection,
    /// Registry fetch behaviour.
    pub fetch: FetchSection,
    /// Dependency install behaviour.
    pub install: InstallSection,
    /// Tracer behaviour and output bounds.
    pub trace: TraceSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ToolsSection
// ---------------------------------------------------------------------------

/// Program names or paths for each external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Registry client used for `pack`.
    pub registry_client: String,
    /// Archive extractor used for `-xzf`.
    pub extractor: String,
    /// Package manager used for `install`.
    pub package_manager: String,
    /// Syscall tracer.
    pub tracer: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            registry_client: "npm".to_owned(),
            extractor: "tar".to_owned(),
            package_manager: "npm".to_owned(),
            tracer: "strace".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchSection
// ---------------------------------------------------------------------------

/// Registry fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Pass `--ignore-scripts` to the registry client.
    pub ignore_scripts: bool,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            ignore_scripts: true,
        }
    }
}

// ---------------------------------------------------------------------------
// InstallSection
// ---------------------------------------------------------------------------

/// Dependency install settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Install production dependencies before tracing hooks.
    ///
    /// Dependency lifecycle scripts run untraced when this is on.
    pub enabled: bool,
    /// Regex with one capture group extracting the added-package count.
    pub summary_pattern: String,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            enabled: true,
            summary_pattern: DEFAULT_SUMMARY_PATTERN.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSection
// ---------------------------------------------------------------------------

/// Tracer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSection {
    /// Directory receiving trace files, relative to the working directory
    /// unless absolute.
    pub output_dir: PathBuf,
    /// Ceiling for each of stdout and stderr, in bytes.
    pub max_output_bytes: usize,
    /// Maximum string length dumped per syscall record.
    pub string_limit: usize,
    /// Syscall classes passed as `-e trace=<filter>`.
    pub syscall_filter: String,
}

impl Default for TraceSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("traces"),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            string_limit: DEFAULT_STRING_LIMIT,
            syscall_filter: "file,network".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base filter level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra `EnvFilter` directives, e.g. `hookscope_audit=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sections_use_defaults() {
        let config: Config = toml::from_str("[tools]\n[trace]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn embedded_defaults_match_default_impl() {
        let config: Config = toml::from_str(include_str!("defaults.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_fields() {
        let config: Config = toml::from_str("[tools]\ntracer = \"/usr/local/bin/strace\"\n").unwrap();
        assert_eq!(config.tools.tracer, "/usr/local/bin/strace");
        assert_eq!(config.tools.registry_client, "npm");
    }
}
