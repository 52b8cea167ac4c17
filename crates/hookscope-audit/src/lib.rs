//! hookscope audit - trace what a package's lifecycle hooks touch.
//!
//! The pipeline downloads a package with the registry client, extracts it,
//! optionally installs its production dependencies, and runs each registered
//! lifecycle hook under a syscall tracer:
//!
//! - [`PackageFetcher`] downloads and extracts, discovering the extracted
//!   folder by diffing the working directory.
//! - [`DependencyResolver`] runs the package manager's install and reads the
//!   added-package count through a [`SummaryParser`].
//! - [`list_registered_hooks`] filters a [`Manifest`]'s scripts down to the
//!   six lifecycle hooks.
//! - [`TracedExecutor`] runs one shell command under the tracer and lists
//!   the per-process trace files.
//! - [`Auditor`] chains the steps and produces an [`AuditReport`].
//!
//! Every child process goes through [`process::run`], which caps each output
//! stream and kills the child on every early return.
//!
//! # Example
//!
//! ```rust,no_run
//! use hookscope_audit::Auditor;
//! use hookscope_config::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auditor = Auditor::from_config(&Config::default())?;
//! let report = auditor.audit("left-pad@1.3.0", std::path::Path::new("/tmp/audit")).await?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod fetch;
pub mod hooks;
pub mod install;
pub mod manifest;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod summary;
pub mod trace;

pub use error::{AuditError, AuditResult, OutputStream};
pub use fetch::{PackageArtifact, PackageFetcher};
pub use hooks::{HookSet, LifecycleHook, UnknownHook, list_registered_hooks};
pub use install::{DependencyResolver, InstallSummary};
pub use manifest::Manifest;
pub use pipeline::{Auditor, hook_env};
pub use process::{CapturedOutput, DEFAULT_MAX_OUTPUT_BYTES, ToolCommand};
pub use report::{AuditReport, HookTrace};
pub use summary::{RegexSummaryParser, SummaryParser};
pub use trace::{
    TraceFile, TraceOptions, TraceRequest, TraceResult, TracedExecutor, collect_trace_files,
};
