//! Audit error types.

use std::fmt;
use std::path::PathBuf;

/// Which captured stream overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Errors from the fetch → install → trace pipeline.
///
/// Nothing is retried; every variant aborts the remaining steps.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// More than one new entry appeared in the working directory after
    /// extraction.
    #[error("ambiguous extraction: expected one new entry, found {}: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousExtraction {
        /// Every new entry, sorted.
        candidates: Vec<String>,
    },

    /// Extraction produced no new entry in the working directory.
    #[error("extraction of {archive} produced no new entry in {working_dir}")]
    ExtractionNotFound {
        /// The archive that was extracted.
        archive: PathBuf,
        /// Directory that was diffed.
        working_dir: PathBuf,
    },

    /// The registry client printed nothing usable as an archive name.
    #[error("`{command}` did not report an archive file name")]
    ArchiveNotReported {
        /// The command line that ran.
        command: String,
    },

    /// An external program exited unsuccessfully.
    #[error("`{command}` failed with {}: {stderr}", .exit_code.map_or_else(|| "signal".to_string(), |c| format!("exit code {c}")))]
    ChildProcess {
        /// The command line that ran.
        command: String,
        /// Exit code, `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// An external program could not be started (usually not installed).
    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        /// The command line that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a child's output failed.
    #[error("failed to capture {stream} of `{command}`: {source}")]
    CaptureFailed {
        /// The command line that ran.
        command: String,
        /// Which stream was being read.
        stream: OutputStream,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The child started but waiting for its exit status failed.
    #[error("failed to wait for `{command}`: {source}")]
    WaitFailed {
        /// The command line that ran.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A captured stream exceeded the output ceiling.
    #[error("`{command}` wrote more than {limit} bytes to {stream}")]
    OutputOverflow {
        /// The command line that ran.
        command: String,
        /// Which stream overflowed.
        stream: OutputStream,
        /// The ceiling in bytes.
        limit: usize,
    },

    /// The install summary did not contain an added-package count.
    #[error("install summary did not match /{pattern}/: {output}")]
    MalformedSummary {
        /// The pattern that was tried.
        pattern: String,
        /// The output that was searched.
        output: String,
    },

    /// A summary pattern could not be compiled or has no capture group.
    #[error("invalid summary pattern /{pattern}/: {message}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// `package.json` could not be parsed.
    #[error("manifest parse error in {path}: {source}")]
    ManifestParse {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem error outside of child-process handling.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl AuditError {
    /// Whether this is a failure of an external program (spawn, wait or exit).
    #[must_use]
    pub fn is_child_process_failure(&self) -> bool {
        matches!(
            self,
            Self::ChildProcess { .. } | Self::SpawnFailed { .. } | Self::WaitFailed { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_extraction_lists_candidates() {
        let err = AuditError::AmbiguousExtraction {
            candidates: vec!["a".into(), "b".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn child_process_message_has_status_and_stderr() {
        let err = AuditError::ChildProcess {
            command: "npm pack nope".into(),
            exit_code: Some(1),
            stderr: "404 Not Found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("npm pack nope"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("404 Not Found"));
        assert!(err.is_child_process_failure());
    }

    #[test]
    fn signal_exit_is_reported() {
        let err = AuditError::ChildProcess {
            command: "sh -c 'kill -9 $$'".into(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn spawn_failure_counts_as_child_process_failure() {
        let err = AuditError::SpawnFailed {
            command: "strace".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_child_process_failure());
        assert!(
            !AuditError::AmbiguousExtraction { candidates: vec![] }.is_child_process_failure()
        );
    }

    #[test]
    fn wait_failure_is_not_a_spawn_failure() {
        let err = AuditError::WaitFailed {
            command: "npm install".into(),
            source: std::io::Error::other("interrupted"),
        };
        assert!(err.to_string().starts_with("failed to wait for `npm install`"));
        assert!(err.is_child_process_failure());
        assert!(!matches!(err, AuditError::SpawnFailed { .. }));
    }
}
