//! Bounded child-process execution.
//!
//! Every external program the pipeline calls goes through [`run`]. On unix the
//! child leads its own process group, and the whole group is killed when
//! `run` returns or its future is dropped. Background processes a hook leaves
//! behind die with it, on overflow and I/O errors too.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{AuditError, AuditResult, OutputStream};

/// Ceiling applied to each captured stream (50 MiB).
pub use hookscope_config::DEFAULT_MAX_OUTPUT_BYTES;

/// An external program invocation with an explicit working directory.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    env: Vec<(String, OsString)>,
}

impl ToolCommand {
    /// Create a command that runs `program` inside `working_dir`.
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The directory the child runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Shell-like rendering for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_for_display)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_display(part: &str) -> String {
    if !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=,:@+%".contains(c))
    {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}

/// Output of a successful child process.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// Each stream is capped at `max_output_bytes`; a stream that exceeds the cap
/// fails the run instead of being truncated. There is no timeout.
///
/// # Errors
///
/// - [`AuditError::SpawnFailed`] if the program cannot be started.
/// - [`AuditError::CaptureFailed`] if reading output fails.
/// - [`AuditError::WaitFailed`] if the exit status cannot be collected.
/// - [`AuditError::OutputOverflow`] if either stream exceeds the cap.
/// - [`AuditError::ChildProcess`] on a non-zero exit, with stderr attached.
pub async fn run(command: &ToolCommand, max_output_bytes: usize) -> AuditResult<CapturedOutput> {
    let line = command.display();
    debug!(command = %line, cwd = %command.working_dir.display(), "Spawning");

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(&command.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    for (key, value) in &command.env {
        cmd.env(key, value);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| AuditError::SpawnFailed {
        command: line.clone(),
        source,
    })?;
    let _group = GroupKill::new(child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr) = tokio::try_join!(
        read_capped(stdout, max_output_bytes, OutputStream::Stdout, &line),
        read_capped(stderr, max_output_bytes, OutputStream::Stderr, &line),
    )?;

    let status = child.wait().await.map_err(|source| AuditError::WaitFailed {
        command: line.clone(),
        source,
    })?;
    let elapsed = started.elapsed();

    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        warn!(
            command = %line,
            exit_code = ?status.code(),
            stderr = %stderr.trim_end(),
            "Command failed"
        );
        return Err(AuditError::ChildProcess {
            command: line,
            exit_code: status.code(),
            stderr,
        });
    }

    debug!(
        command = %line,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Command finished"
    );

    Ok(CapturedOutput {
        stdout,
        stderr,
        elapsed,
    })
}

/// Sends `SIGKILL` to a child's process group when dropped.
///
/// Declared after the child so it runs first on unwind.
struct GroupKill {
    #[cfg(unix)]
    pgid: Option<nix::unistd::Pid>,
}

impl GroupKill {
    #[cfg(unix)]
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid
                .and_then(|p| i32::try_from(p).ok())
                .map(nix::unistd::Pid::from_raw),
        }
    }

    #[cfg(not(unix))]
    fn new(_pid: Option<u32>) -> Self {
        Self {}
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            // ESRCH: every member already exited.
            match nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {},
                Err(e) => warn!(pgid = pgid.as_raw(), error = %e, "Failed to kill process group"),
            }
        }
    }
}

/// Read a stream to EOF, failing once more than `limit` bytes arrive.
async fn read_capped<R>(
    reader: Option<R>,
    limit: usize,
    stream: OutputStream,
    command: &str,
) -> AuditResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };

    // One byte past the limit is enough to detect overflow.
    let ceiling = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    reader
        .take(ceiling)
        .read_to_end(&mut buf)
        .await
        .map_err(|source| AuditError::CaptureFailed {
            command: command.to_string(),
            stream,
            source,
        })?;

    if buf.len() > limit {
        warn!(command = %command, stream = %stream, limit, "Output ceiling exceeded");
        return Err(AuditError::OutputOverflow {
            command: command.to_string(),
            stream,
            limit,
        });
    }

    Ok(buf)
}
