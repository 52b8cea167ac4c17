//! Config command: inspect the resolved configuration.

use anyhow::{Result, bail};
use hookscope_config::{Config, ResolvedConfig};

use crate::theme::Theme;

/// Print the resolved configuration as TOML or JSON.
pub(crate) fn show_config(config: &Config, syntax: &str) -> Result<()> {
    let rendered = match syntax {
        "toml" => toml::to_string_pretty(config)?,
        "json" => serde_json::to_string_pretty(config)?,
        other => bail!("unknown config syntax '{other}', expected toml or json"),
    };
    println!("{rendered}");
    Ok(())
}

/// Print the files and environment variables the configuration came from.
pub(crate) fn show_paths(resolved: &ResolvedConfig) {
    println!("{}", Theme::title("Configuration sources"));
    println!("  defaults: {}", Theme::muted("<embedded>"));
    for (layer, path) in &resolved.loaded_files {
        println!("  {layer}: {}", path.display());
    }
    if resolved.env_applied.is_empty() {
        println!("  env: {}", Theme::muted("none"));
    } else {
        println!("  env: {}", resolved.env_applied.join(", "));
    }
}
