//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `HOOKSCOPE_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HOOKSCOPE_REGISTRY_CLIENT",
        field_path: "tools.registry_client",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_EXTRACTOR",
        field_path: "tools.extractor",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_PACKAGE_MANAGER",
        field_path: "tools.package_manager",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_TRACER",
        field_path: "tools.tracer",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_INSTALL_ENABLED",
        field_path: "install.enabled",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_TRACE_DIR",
        field_path: "trace.output_dir",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_MAX_OUTPUT_BYTES",
        field_path: "trace.max_output_bytes",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "HOOKSCOPE_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Snapshot the process environment into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply env var fallbacks to `merged` for every field not in `set_by_files`.
///
/// The raw string is converted to the type already present at the field path
/// (bool, integer, or string).
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when a value cannot be converted.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
    set_by_files: &[String],
) -> ConfigResult<Vec<&'static str>> {
    let mut applied = Vec::new();

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if set_by_files.iter().any(|p| p == mapping.field_path) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "env var ignored; field set by config file"
            );
            continue;
        }

        let (section, field) = mapping
            .field_path
            .split_once('.')
            .unwrap_or(("", mapping.field_path));
        let Some(table) = merged.get_mut(section).and_then(toml::Value::as_table_mut) else {
            continue;
        };

        let value = convert(table.get(field), raw).map_err(|message| ConfigError::Env {
            var: mapping.var_name,
            message,
        })?;
        table.insert(field.to_owned(), value);
        applied.push(mapping.var_name);
    }

    Ok(applied)
}

fn convert(existing: Option<&toml::Value>, raw: &str) -> Result<toml::Value, String> {
    match existing {
        Some(toml::Value::Boolean(_)) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            other => Err(format!("expected a boolean, got '{other}'")),
        },
        Some(toml::Value::Integer(_)) => raw
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| format!("expected an integer: {e}")),
        _ => Ok(toml::Value::String(raw.to_owned())),
    }
}
