//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.hookscope/config.toml` (user)
//! 3. Merge `{workspace}/.hookscope/config.toml` (workspace)
//! 4. Merge an explicitly requested file, if any
//! 5. Apply `HOOKSCOPE_*` env var fallbacks for fields no file set
//! 6. Deserialize merged tree → `Config`
//! 7. Validate
//! 8. Return `ResolvedConfig`

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, deep_merge, leaf_paths};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Files merged on top of the defaults, in precedence order.
    pub loaded_files: Vec<(ConfigLayer, PathBuf)>,
    /// Environment variables that supplied a value.
    pub env_applied: Vec<&'static str>,
}

/// Load the configuration with layered file precedence.
///
/// `workspace_root` is the directory whose `.hookscope/config.toml` is
/// merged; `explicit` is a file passed on the command line; `home_override`
/// replaces the user's home directory for user-level discovery.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, if an env var
/// cannot be converted, or if the merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    explicit: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            origin: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut loaded_files = Vec::new();
    let mut set_by_files = Vec::new();

    // 2. User config. A missing home directory only skips this layer.
    let home_dir = match home_override {
        Some(h) => Some(h.to_path_buf()),
        None => home_directory().ok(),
    };
    if let Some(home) = home_dir {
        let user_path = home.join(".hookscope").join("config.toml");
        merge_layer(
            &mut merged,
            &user_path,
            ConfigLayer::User,
            &mut loaded_files,
            &mut set_by_files,
        )?;
    }

    // 3. Workspace config.
    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(".hookscope").join("config.toml");
        merge_layer(
            &mut merged,
            &ws_path,
            ConfigLayer::Workspace,
            &mut loaded_files,
            &mut set_by_files,
        )?;
    }

    // 4. Explicit file must exist.
    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::MissingExplicit {
            path: path.to_path_buf(),
        })?;
        leaf_paths(&overlay, "", &mut set_by_files);
        deep_merge(&mut merged, &overlay);
        loaded_files.push((ConfigLayer::Explicit, path.to_path_buf()));
        info!(path = %path.display(), "loaded explicit config");
    }

    // 5. Env var fallbacks.
    let env_applied = apply_env_fallbacks(&mut merged, &env_vars, &set_by_files)?;
    if !env_applied.is_empty() {
        debug!(count = env_applied.len(), "applied environment variable fallbacks");
    }

    // 6. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                origin: "<merged config>".to_owned(),
                source: e,
            })?;

    // 7. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_applied,
    })
}

fn merge_layer(
    merged: &mut toml::Value,
    path: &Path,
    layer: ConfigLayer,
    loaded_files: &mut Vec<(ConfigLayer, PathBuf)>,
    set_by_files: &mut Vec<String>,
) -> ConfigResult<()> {
    if let Some(overlay) = try_load_file(path)? {
        leaf_paths(&overlay, "", set_by_files);
        deep_merge(merged, &overlay);
        loaded_files.push((layer, path.to_path_buf()));
        info!(path = %path.display(), layer = %layer, "loaded config layer");
    }
    Ok(())
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        },
    };

    let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        origin: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(".hookscope");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_parse() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        let table = val.as_table().unwrap();
        assert!(table.contains_key("tools"));
        assert!(table.contains_key("trace"));
    }

    #[test]
    fn test_load_with_empty_home() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load(None, None, Some(home.path())).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.trace.string_limit, 8192);
        assert_eq!(
            resolved.config.install.summary_pattern,
            crate::types::DEFAULT_SUMMARY_PATTERN
        );
    }

    #[test]
    fn test_workspace_overrides_user() {
        let home = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        write_config(home.path(), "[tools]\ntracer = \"/home/strace\"\nextractor = \"bsdtar\"\n");
        write_config(ws.path(), "[tools]\ntracer = \"/ws/strace\"\n");

        let resolved = load(Some(ws.path()), None, Some(home.path())).unwrap();

        assert_eq!(resolved.config.tools.tracer, "/ws/strace");
        assert_eq!(resolved.config.tools.extractor, "bsdtar");
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(resolved.loaded_files[1].0, ConfigLayer::Workspace);
    }

    #[test]
    fn test_explicit_file_wins() {
        let home = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        write_config(ws.path(), "[install]\nenabled = true\n");
        let explicit = ws.path().join("audit.toml");
        std::fs::write(&explicit, "[install]\nenabled = false\n").unwrap();

        let resolved = load(Some(ws.path()), Some(&explicit), Some(home.path())).unwrap();
        assert!(!resolved.config.install.enabled);

        let layers: Vec<ConfigLayer> = resolved.loaded_files.iter().map(|(l, _)| *l).collect();
        assert_eq!(layers, vec![ConfigLayer::Workspace, ConfigLayer::Explicit]);
        assert_eq!(ConfigLayer::Explicit.to_string(), "explicit");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let result = load(None, Some(Path::new("/nonexistent/audit.toml")), Some(home.path()));
        assert!(matches!(result, Err(ConfigError::MissingExplicit { .. })));
    }

    #[test]
    fn test_invalid_layer_fails_validation() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[trace]\nmax_output_bytes = 0\n");

        let result = load(None, None, Some(home.path()));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = format!("x = \"{}\"", "a".repeat(1_100_000));
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::TooLarge { .. })),
            "expected TooLarge for oversized config, got: {result:?}"
        );
    }
}
