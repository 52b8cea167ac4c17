//! Traced execution of shell commands.
//!
//! A command runs as `sh -c <command>` under the syscall tracer, which
//! follows forks and writes one `<prefix>.<pid>` file per process. The trace
//! files are listed afterwards but never parsed.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use hookscope_config::Config;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};
use crate::process::{self, DEFAULT_MAX_OUTPUT_BYTES, ToolCommand};

pub use hookscope_config::DEFAULT_STRING_LIMIT;

/// Default syscall classes passed to the tracer (`-e trace=`).
pub const DEFAULT_SYSCALL_FILTER: &str = "file,network";

/// How the tracer is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// Tracer program name or path.
    pub tracer: String,
    /// Maximum bytes of each string argument the tracer prints.
    pub string_limit: usize,
    /// Syscall classes to trace.
    pub syscall_filter: String,
    /// Per-stream ceiling on the traced command's output.
    pub max_output_bytes: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            tracer: "strace".to_string(),
            string_limit: DEFAULT_STRING_LIMIT,
            syscall_filter: DEFAULT_SYSCALL_FILTER.to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl From<&Config> for TraceOptions {
    fn from(config: &Config) -> Self {
        Self {
            tracer: config.tools.tracer.clone(),
            string_limit: config.trace.string_limit,
            syscall_filter: config.trace.syscall_filter.clone(),
            max_output_bytes: config.trace.max_output_bytes,
        }
    }
}

/// One command to run under the tracer.
#[derive(Debug, Clone)]
pub struct TraceRequest {
    command: String,
    working_dir: PathBuf,
    trace_prefix: PathBuf,
    env: Vec<(String, OsString)>,
}

impl TraceRequest {
    /// Trace `command` in `working_dir`, writing `<trace_prefix>.<pid>`
    /// files. A relative prefix is resolved against `working_dir`.
    pub fn new(
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        trace_prefix: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            trace_prefix: trace_prefix.into(),
            env: Vec::new(),
        }
    }

    /// Set an environment variable for the traced command.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The shell command being traced.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The prefix with a relative path resolved against the working directory.
    #[must_use]
    pub fn resolved_prefix(&self) -> PathBuf {
        if self.trace_prefix.is_absolute() {
            self.trace_prefix.clone()
        } else {
            self.working_dir.join(&self.trace_prefix)
        }
    }
}

/// Metadata of one per-process trace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFile {
    /// Full path of the file.
    pub path: PathBuf,
    /// Traced process id, taken from the file name suffix.
    pub pid: u32,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Outcome of one traced execution.
#[derive(Debug, Clone)]
pub struct TraceResult {
    /// Trace files written by this run, ordered by pid.
    pub trace_files: Vec<TraceFile>,
    /// The command's standard output.
    pub stdout: String,
    /// The command's standard error (interleaved with tracer diagnostics).
    pub stderr: String,
    /// Wall-clock time around the whole traced invocation.
    pub runtime: Duration,
}

impl TraceResult {
    /// Runtime in whole milliseconds.
    #[must_use]
    pub fn runtime_ms(&self) -> u64 {
        u64::try_from(self.runtime.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Runs shell commands under the syscall tracer.
#[derive(Debug, Clone, Default)]
pub struct TracedExecutor {
    options: TraceOptions,
}

impl TracedExecutor {
    /// Create an executor with the given tracer options.
    #[must_use]
    pub fn new(options: TraceOptions) -> Self {
        Self { options }
    }

    /// The tracer options in use.
    #[must_use]
    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    fn tracer_command(&self, request: &TraceRequest, prefix: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.options.tracer, &request.working_dir)
            .arg("-ff")
            .arg("-o")
            .arg(prefix.to_string_lossy())
            .arg("-e")
            .arg(format!("trace={}", self.options.syscall_filter))
            .arg("-s")
            .arg(self.options.string_limit.to_string())
            .arg("-ttt")
            .args(["sh", "-c"])
            .arg(&request.command);
        for (key, value) in &request.env {
            cmd = cmd.env(key, value);
        }
        cmd
    }

    /// Run `request` under the tracer and list the trace files it wrote.
    ///
    /// Trace files already present under the prefix are only reported if
    /// this run rewrote them.
    ///
    /// # Errors
    ///
    /// - [`AuditError::SpawnFailed`] if the tracer is not available.
    /// - [`AuditError::ChildProcess`] if the traced command exits non-zero.
    /// - [`AuditError::OutputOverflow`] if either stream exceeds the ceiling.
    /// - [`AuditError::Io`] if the trace directory cannot be created or read.
    pub async fn execute(&self, request: &TraceRequest) -> AuditResult<TraceResult> {
        let prefix = request.resolved_prefix();
        if let Some(parent) = prefix.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuditError::io(parent, e))?;
        }

        let existing: BTreeMap<PathBuf, (u64, Option<DateTime<Utc>>)> =
            collect_trace_files(&prefix)
                .await?
                .into_iter()
                .map(|f| (f.path, (f.size, f.modified)))
                .collect();

        let cmd = self.tracer_command(request, &prefix);
        debug!(command = %request.command, prefix = %prefix.display(), "Tracing");

        let started = Instant::now();
        let output = process::run(&cmd, self.options.max_output_bytes).await?;
        let runtime = started.elapsed();

        let trace_files: Vec<TraceFile> = collect_trace_files(&prefix)
            .await?
            .into_iter()
            .filter(|f| {
                existing
                    .get(&f.path)
                    .is_none_or(|before| *before != (f.size, f.modified))
            })
            .collect();

        info!(
            command = %request.command,
            trace_files = trace_files.len(),
            duration_ms = u64::try_from(runtime.as_millis()).unwrap_or(u64::MAX),
            "Traced command finished"
        );

        Ok(TraceResult {
            trace_files,
            stdout: output.stdout,
            stderr: output.stderr,
            runtime,
        })
    }
}

/// Every file named `<prefix>.<digits>`, ordered by pid.
///
/// A missing parent directory yields an empty list.
///
/// # Errors
///
/// Returns [`AuditError::Io`] if the directory or a file's metadata cannot be
/// read.
pub async fn collect_trace_files(prefix: &Path) -> AuditResult<Vec<TraceFile>> {
    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(stem) = prefix.file_name().and_then(|s| s.to_str()) else {
        return Ok(Vec::new());
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AuditError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AuditError::io(dir, e))?
    {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|n| pid_suffix(n, stem)) else {
            continue;
        };
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| AuditError::io(&path, e))?;
        if !metadata.is_file() {
            continue;
        }
        files.push(TraceFile {
            path,
            pid,
            size: metadata.len(),
            modified: metadata.modified().ok().map(to_utc),
        });
    }

    files.sort_by_key(|f| f.pid);
    Ok(files)
}

/// The pid in `<stem>.<digits>`, if `name` has that shape.
fn pid_suffix(name: &str, stem: &str) -> Option<u32> {
    let digits = name.strip_prefix(stem)?.strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
