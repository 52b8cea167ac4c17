//! Audit command: fetch a package and trace its lifecycle hooks.

use std::path::Path;

use anyhow::{Context, Result};
use hookscope_audit::{AuditReport, Auditor};
use hookscope_config::Config;
use hookscope_telemetry::{RunContext, RunGuard};

use crate::OutputFormat;
use crate::theme::Theme;

/// Run the full audit pipeline for `package`.
pub(crate) async fn run_audit(
    config: &Config,
    package: &str,
    dir: Option<&Path>,
    report_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let working_dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    tokio::fs::create_dir_all(&working_dir)
        .await
        .with_context(|| format!("cannot create {}", working_dir.display()))?;

    let _guard = RunGuard::new(
        RunContext::new("audit")
            .with_package(package)
            .with_metadata("working_dir", working_dir.display().to_string()),
    );

    let auditor = Auditor::from_config(config)?;
    let report = auditor
        .audit(package, &working_dir)
        .await
        .with_context(|| format!("audit of {package} failed"))?;

    if let Some(path) = report_path {
        report.write_to(path).await?;
    }

    match format {
        OutputFormat::Json => println!("{}", report.to_json_pretty()?),
        OutputFormat::Pretty => {
            print_report(&report);
            if let Some(path) = report_path {
                println!("{}", Theme::muted(&format!("Report written to {}", path.display())));
            }
        },
    }

    Ok(())
}

fn print_report(report: &AuditReport) {
    let id = Theme::package_id(
        report.name.as_deref(),
        report.version.as_deref(),
        &report.package,
    );
    println!("{}", Theme::title(&format!("Audit of {id}")));
    println!("  Extracted: {}", report.artifact.package_root().display());
    match report.dependencies_added {
        Some(n) => println!("  Dependencies added: {n}"),
        None => println!("  Dependencies added: {}", Theme::muted("skipped")),
    }
    println!("{}", Theme::rule());

    if report.hooks.is_empty() {
        println!("{}", Theme::clean("No lifecycle hooks registered"));
        return;
    }

    for hook in &report.hooks {
        println!("{}", Theme::hook_summary(hook));
        for file in &hook.trace_files {
            println!("{}", Theme::trace_file(file));
        }
    }

    println!("{}", Theme::rule());
    println!(
        "{}",
        Theme::attention(&format!(
            "{} hook(s) executed, {} trace file(s) to review",
            report.hooks.len(),
            report.trace_file_count()
        ))
    );
}
