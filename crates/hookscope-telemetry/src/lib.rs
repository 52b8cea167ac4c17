//! hookscope telemetry - logging setup and run correlation.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - A run context whose span correlates every log line of one invocation
//!
//! # Example
//!
//! ```rust,no_run
//! use hookscope_telemetry::{LogConfig, LogFormat, RunContext, RunGuard, setup_logging};
//!
//! # fn main() -> Result<(), hookscope_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("hookscope_audit=trace");
//! setup_logging(&config)?;
//!
//! let _guard = RunGuard::new(RunContext::new("audit").with_package("left-pad"));
//! tracing::info!("auditing");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod context;
mod error;
mod logging;

pub use context::{RunContext, RunGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
