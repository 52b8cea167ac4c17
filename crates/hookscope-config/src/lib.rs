#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for hookscope.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hookscope_config::Config;
//!
//! let resolved = Config::load(Some(std::path::Path::new(".")), None).unwrap();
//! println!("tracer: {}", resolved.config.tools.tracer);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit** (`--config <file>`)
//! 2. **Workspace** (`{workspace}/.hookscope/config.toml`)
//! 3. **User** (`~/.hookscope/config.toml`)
//! 4. **Environment variables** (`HOOKSCOPE_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into binary)

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(
        workspace_root: Option<&std::path::Path>,
        explicit: Option<&std::path::Path>,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, explicit, None)
    }

    /// Load configuration with an explicit home directory override.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        workspace_root: Option<&std::path::Path>,
        explicit: Option<&std::path::Path>,
        home_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(workspace_root, explicit, Some(home_dir))
    }
}
