//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_tools(config)?;
    validate_install(config)?;
    validate_trace(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_tools(config: &Config) -> ConfigResult<()> {
    let t = &config.tools;
    for (field, value) in [
        ("tools.registry_client", &t.registry_client),
        ("tools.extractor", &t.extractor),
        ("tools.package_manager", &t.package_manager),
        ("tools.tracer", &t.tracer),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(field, "program name must not be empty"));
        }
    }
    Ok(())
}

fn validate_install(config: &Config) -> ConfigResult<()> {
    let pattern = &config.install.summary_pattern;
    let re = regex::Regex::new(pattern)
        .map_err(|e| invalid("install.summary_pattern", format!("invalid regex: {e}")))?;

    // Group 0 is the whole match.
    if re.captures_len() < 2 {
        return Err(invalid(
            "install.summary_pattern",
            "pattern must contain a capture group for the package count",
        ));
    }
    Ok(())
}

fn validate_trace(config: &Config) -> ConfigResult<()> {
    let t = &config.trace;

    if t.max_output_bytes == 0 {
        return Err(invalid("trace.max_output_bytes", "must be greater than zero"));
    }
    if t.string_limit == 0 {
        return Err(invalid("trace.string_limit", "must be greater than zero"));
    }
    if t.syscall_filter.trim().is_empty() {
        return Err(invalid("trace.syscall_filter", "must not be empty"));
    }
    if t.output_dir.as_os_str().is_empty() {
        return Err(invalid("trace.output_dir", "must not be empty"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error, off",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn empty_tracer_rejected() {
        let mut config = Config::default();
        config.tools.tracer = "  ".to_owned();

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("tools.tracer"));
    }

    #[test]
    fn summary_pattern_needs_capture_group() {
        let mut config = Config::default();
        config.install.summary_pattern = "added packages".to_owned();
        assert!(validate(&config).is_err());

        config.install.summary_pattern = "added (".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_output_ceiling_rejected() {
        let mut config = Config::default();
        config.trace.max_output_bytes = 0;

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("trace.max_output_bytes"));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }
}
