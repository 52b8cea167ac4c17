//! Lifecycle hook selection.
//!
//! Only the six install/uninstall hooks a package manager runs on its own are
//! audited. Everything else in `scripts` (`test`, `build`, ...) is ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

/// A script name the package manager runs automatically.
///
/// Variant order is lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleHook {
    /// Runs before the package is installed.
    Preinstall,
    /// Runs during install.
    Install,
    /// Runs after the package is installed.
    Postinstall,
    /// Runs before the package is removed.
    Preuninstall,
    /// Runs during removal.
    Uninstall,
    /// Runs after the package is removed.
    Postuninstall,
}

impl LifecycleHook {
    /// Every hook, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Preinstall,
        Self::Install,
        Self::Postinstall,
        Self::Preuninstall,
        Self::Uninstall,
        Self::Postuninstall,
    ];

    /// The script name as written in `package.json`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preinstall => "preinstall",
            Self::Install => "install",
            Self::Postinstall => "postinstall",
            Self::Preuninstall => "preuninstall",
            Self::Uninstall => "uninstall",
            Self::Postuninstall => "postuninstall",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a script name outside the lifecycle set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a lifecycle hook")]
pub struct UnknownHook(pub String);

impl FromStr for LifecycleHook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| UnknownHook(s.to_string()))
    }
}

/// Registered lifecycle hooks of one package: hook → shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookSet(BTreeMap<LifecycleHook, String>);

impl HookSet {
    /// Keep only lifecycle entries of a script mapping; values are copied
    /// verbatim.
    #[must_use]
    pub fn from_scripts(scripts: Option<&BTreeMap<String, String>>) -> Self {
        let hooks = scripts
            .into_iter()
            .flatten()
            .filter_map(|(name, command)| {
                name.parse::<LifecycleHook>()
                    .ok()
                    .map(|hook| (hook, command.clone()))
            })
            .collect();
        Self(hooks)
    }

    /// Command registered for `hook`.
    #[must_use]
    pub fn get(&self, hook: LifecycleHook) -> Option<&str> {
        self.0.get(&hook).map(String::as_str)
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hooks and commands in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (LifecycleHook, &str)> {
        self.0.iter().map(|(hook, cmd)| (*hook, cmd.as_str()))
    }
}

/// The lifecycle hooks `manifest` registers.
#[must_use]
pub fn list_registered_hooks(manifest: &Manifest) -> HookSet {
    HookSet::from_scripts(manifest.scripts.as_ref())
}
