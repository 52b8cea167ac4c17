//! hookscope test - shared test utilities.
//!
//! The pipeline only talks to the outside world through external programs.
//! [`FakeToolbox`] writes small shell scripts that stand in for the registry
//! client, the archive extractor, the package manager, and the syscall
//! tracer, so tests run without network access or a real tracer.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! hookscope-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use hookscope_test::FakeToolbox;
//!
//! let tools = FakeToolbox::new();
//! let npm = tools.registry_client("pkg-1.0.0.tgz");
//! let tar = tools.extractor(&["pkg-1.0.0"]);
//! let fetcher = PackageFetcher::new(npm.display().to_string(), tar.display().to_string());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;

pub use fixtures::*;
