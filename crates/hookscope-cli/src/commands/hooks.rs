//! Hooks command: list a local package's lifecycle hooks.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use hookscope_audit::{Manifest, list_registered_hooks};

use crate::OutputFormat;
use crate::theme::Theme;

/// Print the lifecycle hooks `dir/package.json` registers.
pub(crate) async fn list_hooks(dir: &Path, format: OutputFormat) -> Result<()> {
    let manifest = Manifest::load(dir).await?;
    let hooks = list_registered_hooks(&manifest);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&hooks)?);
        return Ok(());
    }

    let id = manifest
        .display_id()
        .unwrap_or_else(|| dir.display().to_string());
    println!("{}", Theme::title(&format!("Lifecycle hooks of {id}")));

    if hooks.is_empty() {
        println!("{}", Theme::clean("None registered"));
        return Ok(());
    }
    for (hook, command) in hooks.iter() {
        println!("  {:<14} {}", hook.to_string().bold(), command);
    }
    Ok(())
}
