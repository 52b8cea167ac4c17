//! Run context for correlating log lines of one invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Context for one CLI invocation (an audit, a single trace, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Command that created this context (`audit`, `trace`, ...).
    pub command: String,
    /// Package specifier, when the run targets one.
    pub package: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RunContext {
    /// Create a new run context.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            command: command.into(),
            package: None,
            started_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the package being audited.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        // Utc::now() >= started_at by construction
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds()
    }

    /// Create a tracing span with this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "run",
            run_id = %self.short_id(),
            command = %self.command,
            package = self.package.as_deref(),
        )
    }

    /// Get a short identifier for logging.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.run_id.simple().to_string()[..8].to_string()
    }
}

/// Guard that keeps the run span entered and logs when the run completes.
pub struct RunGuard {
    context: RunContext,
    /// Held to keep the span active until the guard is dropped.
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl RunGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: RunContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("Run started");
        Self { context, span }
    }

    /// Get the run context.
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "Run completed");
    }
}
