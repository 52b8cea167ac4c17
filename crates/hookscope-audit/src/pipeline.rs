//! The audit pipeline: fetch, install, list hooks, trace each hook.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use hookscope_config::Config;
use tracing::{Instrument, info, info_span};

use crate::error::{AuditError, AuditResult};
use crate::fetch::PackageFetcher;
use crate::hooks::{HookSet, LifecycleHook, list_registered_hooks};
use crate::install::DependencyResolver;
use crate::manifest::Manifest;
use crate::report::{AuditReport, HookTrace};
use crate::summary::RegexSummaryParser;
use crate::trace::{TraceOptions, TraceRequest, TracedExecutor};

/// Directory holding a package's dependency executables.
const BIN_DIR: &str = "node_modules/.bin";

/// Runs the full audit for one package.
#[derive(Debug, Clone)]
pub struct Auditor {
    fetcher: PackageFetcher,
    resolver: Option<DependencyResolver>,
    executor: TracedExecutor,
    trace_dir: PathBuf,
}

impl Auditor {
    /// Assemble an auditor from its parts. `resolver: None` skips the
    /// dependency install.
    #[must_use]
    pub fn new(
        fetcher: PackageFetcher,
        resolver: Option<DependencyResolver>,
        executor: TracedExecutor,
        trace_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            executor,
            trace_dir: trace_dir.into(),
        }
    }

    /// Build an auditor from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPattern`] if the install summary pattern
    /// is unusable.
    pub fn from_config(config: &Config) -> AuditResult<Self> {
        let max_output_bytes = config.trace.max_output_bytes;

        let fetcher = PackageFetcher::new(&config.tools.registry_client, &config.tools.extractor)
            .with_ignore_scripts(config.fetch.ignore_scripts)
            .with_max_output_bytes(max_output_bytes);

        let resolver = if config.install.enabled {
            let parser = RegexSummaryParser::new(&config.install.summary_pattern)?;
            Some(
                DependencyResolver::new(&config.tools.package_manager)
                    .with_parser(Arc::new(parser))
                    .with_max_output_bytes(max_output_bytes),
            )
        } else {
            None
        };

        let executor = TracedExecutor::new(TraceOptions::from(config));

        Ok(Self::new(
            fetcher,
            resolver,
            executor,
            config.trace.output_dir.clone(),
        ))
    }

    /// Fetch `spec` into `working_dir` and trace its lifecycle hooks.
    ///
    /// The first failing step aborts the run.
    ///
    /// # Errors
    ///
    /// Any error from the fetch, manifest, install, or trace steps.
    pub async fn audit(&self, spec: &str, working_dir: &Path) -> AuditResult<AuditReport> {
        let span = info_span!("audit", package = spec);
        self.audit_inner(spec, working_dir).instrument(span).await
    }

    async fn audit_inner(&self, spec: &str, working_dir: &Path) -> AuditResult<AuditReport> {
        let started_at = Utc::now();
        let working_dir = tokio::fs::canonicalize(working_dir)
            .await
            .map_err(|e| AuditError::io(working_dir, e))?;

        let artifact = self.fetcher.fetch(spec, &working_dir).await?;
        let package_dir = artifact.package_root();
        let manifest = Manifest::load(&package_dir).await?;

        let dependencies_added = match &self.resolver {
            Some(resolver) => Some(resolver.install(&package_dir).await?.added_packages),
            None => {
                info!("Dependency install disabled");
                None
            },
        };

        let hooks = list_registered_hooks(&manifest);
        info!(hooks = hooks.len(), "Lifecycle hooks found");

        let trace_dir = working_dir.join(&self.trace_dir);
        let traces = self
            .trace_hooks(&package_dir, &manifest, &hooks, &trace_dir)
            .await?;

        Ok(AuditReport {
            package: spec.to_string(),
            name: manifest.name,
            version: manifest.version,
            artifact,
            dependencies_added,
            hooks: traces,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Trace every hook in `hooks`, in lifecycle order, inside `package_dir`.
    ///
    /// Each hook writes `<trace_dir>/<hook>.<pid>` files.
    ///
    /// # Errors
    ///
    /// Stops at the first hook that fails.
    pub async fn trace_hooks(
        &self,
        package_dir: &Path,
        manifest: &Manifest,
        hooks: &HookSet,
        trace_dir: &Path,
    ) -> AuditResult<Vec<HookTrace>> {
        let mut traces = Vec::with_capacity(hooks.len());
        for (hook, command) in hooks.iter() {
            let mut request = TraceRequest::new(command, package_dir, trace_dir.join(hook.as_str()));
            for (key, value) in hook_env(hook, manifest, package_dir)? {
                request = request.env(key, value);
            }

            let result = self
                .executor
                .execute(&request)
                .instrument(info_span!("hook", hook = %hook))
                .await?;
            info!(
                hook = %hook,
                duration_ms = result.runtime_ms(),
                trace_files = result.trace_files.len(),
                "Hook traced"
            );
            traces.push(HookTrace::new(hook, command, result));
        }
        Ok(traces)
    }
}

/// Environment a package manager gives a running lifecycle script.
///
/// # Errors
///
/// Returns [`AuditError::Io`] if the package's bin directory cannot be joined
/// into `PATH`.
pub fn hook_env(
    hook: LifecycleHook,
    manifest: &Manifest,
    package_dir: &Path,
) -> AuditResult<Vec<(String, OsString)>> {
    let bin_dir = package_dir.join(BIN_DIR);
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let path = std::env::join_paths(
        std::iter::once(bin_dir.clone()).chain(std::env::split_paths(&inherited)),
    )
    .map_err(|e| AuditError::io(&bin_dir, std::io::Error::other(e)))?;

    let mut env = vec![(
        "npm_lifecycle_event".to_string(),
        OsString::from(hook.as_str()),
    )];
    if let Some(name) = &manifest.name {
        env.push(("npm_package_name".to_string(), name.into()));
    }
    if let Some(version) = &manifest.version {
        env.push(("npm_package_version".to_string(), version.into()));
    }
    env.push(("PATH".to_string(), path));
    Ok(env)
}
