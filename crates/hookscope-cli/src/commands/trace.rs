//! Trace command: run one shell command under the tracer.

use std::path::Path;

use anyhow::{Context, Result};
use hookscope_audit::{TraceOptions, TraceRequest, TracedExecutor};
use hookscope_config::Config;
use hookscope_telemetry::{RunContext, RunGuard};
use serde_json::json;

use crate::OutputFormat;
use crate::theme::Theme;

/// File name used under the trace directory when no prefix is given.
const DEFAULT_PREFIX_NAME: &str = "trace";

/// Trace `command` in `cwd` and print its output and trace files.
pub(crate) async fn run_trace(
    config: &Config,
    command: &str,
    cwd: Option<&Path>,
    prefix: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let cwd = match cwd {
        Some(cwd) => cwd.to_path_buf(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let prefix = prefix.map_or_else(
        || config.trace.output_dir.join(DEFAULT_PREFIX_NAME),
        Path::to_path_buf,
    );

    let _guard = RunGuard::new(RunContext::new("trace").with_metadata("command", command));

    let executor = TracedExecutor::new(TraceOptions::from(config));
    let result = executor
        .execute(&TraceRequest::new(command, &cwd, &prefix))
        .await
        .with_context(|| format!("tracing `{command}` failed"))?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "command": command,
                "runtime_ms": result.runtime_ms(),
                "stdout": result.stdout,
                "stderr": result.stderr,
                "trace_files": result.trace_files,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        OutputFormat::Pretty => {
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            println!("{}", Theme::rule());
            println!(
                "{}",
                Theme::clean(&format!(
                    "{} trace file(s) in {}ms",
                    result.trace_files.len(),
                    result.runtime_ms()
                ))
            );
            for file in &result.trace_files {
                println!("{}", Theme::trace_file(file));
            }
        },
    }
    Ok(())
}
