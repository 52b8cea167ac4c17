//! hookscope CLI - audit what a package's lifecycle hooks do.
//!
//! Downloads a package from the registry, runs each install/uninstall hook
//! under a syscall tracer, and reports the trace files each hook produced.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config_bridge;
mod theme;

use commands::{audit, config, doctor, hooks, trace};

/// hookscope - trace package lifecycle hooks
#[derive(Parser)]
#[command(name = "hookscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to an explicit configuration file
    #[arg(short, long, global = true, env = "HOOKSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs to daily-rotated files in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a package and trace its lifecycle hooks
    Audit {
        /// Package identifier passed to the registry client (e.g. `left-pad@1.3.0`)
        package: String,

        /// Working directory for the download (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// List the lifecycle hooks of a local package without running them
    Hooks {
        /// Package directory containing `package.json`
        dir: PathBuf,
    },

    /// Run one shell command under the tracer
    Trace {
        /// Shell command, run via `sh -c`
        command: String,

        /// Directory to run the command in (defaults to the current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Trace file prefix (defaults to `<trace.output_dir>/trace`)
        #[arg(long)]
        prefix: Option<PathBuf>,
    },

    /// Check that the configured external tools are available
    Doctor,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Rendering: toml (default) or json
        #[arg(long, default_value = "toml")]
        syntax: String,
    },
    /// Show which files and environment variables were applied
    Paths,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable, colored.
    Pretty,
    /// Machine-readable JSON on stdout.
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace_root = std::env::current_dir().ok();
    let resolved = hookscope_config::Config::load(workspace_root.as_deref(), cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let mut log_config = if let Ok(r) = &resolved {
        let mut lc = config_bridge::to_log_config(&r.config);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        let level = if cli.verbose { "debug" } else { "info" };
        hookscope_telemetry::LogConfig::new(level)
    };
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_file_logging(dir);
    }
    if let Err(e) = hookscope_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = resolved.context("failed to load configuration")?;
    tracing::debug!(
        files = resolved.loaded_files.len(),
        env = resolved.env_applied.len(),
        "Configuration loaded"
    );

    let output_format = cli.format;

    match cli.command {
        Commands::Audit {
            package,
            dir,
            report,
        } => {
            audit::run_audit(
                &resolved.config,
                &package,
                dir.as_deref(),
                report.as_deref(),
                output_format,
            )
            .await?;
        },
        Commands::Hooks { dir } => {
            hooks::list_hooks(&dir, output_format).await?;
        },
        Commands::Trace {
            command,
            cwd,
            prefix,
        } => {
            trace::run_trace(
                &resolved.config,
                &command,
                cwd.as_deref(),
                prefix.as_deref(),
                output_format,
            )
            .await?;
        },
        Commands::Doctor => {
            doctor::run_doctor(&resolved)?;
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show { syntax } => config::show_config(&resolved.config, &syntax)?,
            ConfigCommands::Paths => config::show_paths(&resolved),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_audit_with_global_flags() {
        let cli = Cli::try_parse_from([
            "hookscope",
            "--format",
            "json",
            "audit",
            "left-pad@1.3.0",
            "--dir",
            "/tmp/work",
            "-v",
            "--log-dir",
            "/tmp/logs",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Audit { package, dir, report } => {
                assert_eq!(package, "left-pad@1.3.0");
                assert_eq!(dir, Some(PathBuf::from("/tmp/work")));
                assert!(report.is_none());
            },
            _ => panic!("expected audit"),
        }
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["hookscope", "--format", "jsno", "doctor"]).is_err());

        let cli = Cli::try_parse_from(["hookscope", "doctor"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Pretty);
    }

    #[test]
    fn trace_takes_command_as_one_argument() {
        let cli =
            Cli::try_parse_from(["hookscope", "trace", "echo hi > out", "--prefix", "t/x"]).unwrap();
        match cli.command {
            Commands::Trace { command, prefix, .. } => {
                assert_eq!(command, "echo hi > out");
                assert_eq!(prefix, Some(PathBuf::from("t/x")));
            },
            _ => panic!("expected trace"),
        }
    }
}
