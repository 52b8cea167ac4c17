//! Audit report.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AuditError, AuditResult};
use crate::fetch::PackageArtifact;
use crate::hooks::LifecycleHook;
use crate::trace::{TraceFile, TraceResult};

/// Result of tracing one lifecycle hook.
#[derive(Debug, Clone, Serialize)]
pub struct HookTrace {
    /// The hook that ran.
    pub hook: LifecycleHook,
    /// The hook's shell command, verbatim from the manifest.
    pub command: String,
    /// Wall-clock runtime in milliseconds.
    pub runtime_ms: u64,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Per-process trace files.
    pub trace_files: Vec<TraceFile>,
}

impl HookTrace {
    /// Attach a hook name and command to a trace result.
    #[must_use]
    pub fn new(hook: LifecycleHook, command: impl Into<String>, result: TraceResult) -> Self {
        let runtime_ms = result.runtime_ms();
        Self {
            hook,
            command: command.into(),
            runtime_ms,
            stdout: result.stdout,
            stderr: result.stderr,
            trace_files: result.trace_files,
        }
    }
}

/// Everything one audit run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Package identifier as requested.
    pub package: String,
    /// `name` from the manifest.
    pub name: Option<String>,
    /// `version` from the manifest.
    pub version: Option<String>,
    /// Downloaded archive and extracted folder.
    pub artifact: PackageArtifact,
    /// Packages added by the dependency install, `None` when it was skipped.
    pub dependencies_added: Option<u64>,
    /// Traced hooks in lifecycle order.
    pub hooks: Vec<HookTrace>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl AuditReport {
    /// Total number of trace files across all hooks.
    #[must_use]
    pub fn trace_file_count(&self) -> usize {
        self.hooks.iter().map(|h| h.trace_files.len()).sum()
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; not expected for this type.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be written.
    pub async fn write_to(&self, path: &Path) -> AuditResult<()> {
        let json = self
            .to_json_pretty()
            .map_err(|e| AuditError::io(path, e.into()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| AuditError::io(path, e))
    }
}
