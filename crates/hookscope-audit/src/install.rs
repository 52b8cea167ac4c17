//! Production dependency install.
//!
//! Dependencies' own lifecycle scripts run here without tracing. Only the
//! audited package's hooks go through the tracer.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::AuditResult;
use crate::process::{self, DEFAULT_MAX_OUTPUT_BYTES, ToolCommand};
use crate::summary::{RegexSummaryParser, SummaryParser};

/// Flags passed to `install`: no audit, no lockfile, production only, no
/// deduplication of nested dependencies.
pub const INSTALL_FLAGS: [&str; 4] = [
    "--no-audit",
    "--no-package-lock",
    "--production",
    "--legacy-bundling",
];

/// Outcome of a dependency install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    /// Packages added, as reported by the package manager.
    pub added_packages: u64,
}

/// Runs the package manager's install inside a package directory.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    package_manager: String,
    parser: Arc<dyn SummaryParser>,
    max_output_bytes: usize,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new("npm")
    }
}

impl DependencyResolver {
    /// Create a resolver using `package_manager` and npm's summary wording.
    pub fn new(package_manager: impl Into<String>) -> Self {
        Self {
            package_manager: package_manager.into(),
            parser: Arc::new(RegexSummaryParser::npm()),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Replace the summary parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn SummaryParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Set the per-stream output ceiling for the install.
    #[must_use]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    fn install_command(&self, package_dir: &Path) -> ToolCommand {
        ToolCommand::new(&self.package_manager, package_dir)
            .arg("install")
            .args(INSTALL_FLAGS)
    }

    /// Install production dependencies in `package_dir`.
    ///
    /// # Errors
    ///
    /// - Child-process errors from the package manager (no retry).
    /// - [`AuditError::MalformedSummary`](crate::AuditError::MalformedSummary)
    ///   if the added-package count cannot be read from stdout.
    pub async fn install(&self, package_dir: &Path) -> AuditResult<InstallSummary> {
        let cmd = self.install_command(package_dir);
        let output = process::run(&cmd, self.max_output_bytes).await?;
        let added_packages = self.parser.added_packages(&output.stdout)?;

        info!(
            dir = %package_dir.display(),
            added_packages,
            "Dependencies installed"
        );
        Ok(InstallSummary { added_packages })
    }
}
