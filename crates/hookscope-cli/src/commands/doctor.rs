//! Doctor command: check that the external tools are installed.

use anyhow::{Result, bail};
use colored::Colorize;
use hookscope_config::ResolvedConfig;

use crate::theme::Theme;

/// Resolve every configured tool on `PATH` and report what is missing.
pub(crate) fn run_doctor(resolved: &ResolvedConfig) -> Result<()> {
    println!("{}", Theme::title("hookscope Doctor - Tool Check"));
    println!();

    print!("  Checking configuration... ");
    println!("{}", "OK".green());
    if resolved.loaded_files.is_empty() {
        println!("    {}", Theme::muted("Using embedded defaults"));
    }
    for (layer, path) in &resolved.loaded_files {
        println!("    {layer}: {}", path.display());
    }

    let tools = &resolved.config.tools;
    let checks = [
        ("registry client", tools.registry_client.as_str()),
        ("archive extractor", tools.extractor.as_str()),
        ("package manager", tools.package_manager.as_str()),
        ("syscall tracer", tools.tracer.as_str()),
    ];

    println!("\n{}", "External tools:".cyan());
    let mut missing = Vec::new();
    for (role, program) in checks {
        match which::which(program) {
            Ok(path) => println!("  {} {role} ({})", "OK".green(), path.display()),
            Err(e) => {
                println!("  {} {role} - {program}: {}", "FAIL".red(), e.to_string().dimmed());
                missing.push(program);
            },
        }
    }

    if !resolved.config.install.enabled {
        println!(
            "  {} dependency install disabled, package manager unused",
            "NOTE".dimmed()
        );
    }

    println!();
    if missing.is_empty() {
        println!("{}", "All tools available".green().bold());
        Ok(())
    } else {
        bail!("missing tools: {}", missing.join(", "))
    }
}
