//! Registry fetch and archive extraction.
//!
//! The extracted folder name is not read from the archive. It is discovered
//! by diffing the working directory before and after, and the fetch refuses
//! to guess when more than one new entry shows up.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};
use crate::process::{self, DEFAULT_MAX_OUTPUT_BYTES, ToolCommand};

/// A downloaded and extracted package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArtifact {
    /// Directory the archive was downloaded to and extracted in.
    pub working_dir: PathBuf,
    /// The downloaded archive.
    pub archive: PathBuf,
    /// Extracted folder relative to `working_dir`, always `./<name>`.
    pub extracted_dir: PathBuf,
}

impl PackageArtifact {
    /// Absolute (or `working_dir`-rooted) path of the extracted folder.
    #[must_use]
    pub fn package_root(&self) -> PathBuf {
        let relative = self
            .extracted_dir
            .strip_prefix(".")
            .unwrap_or(&self.extracted_dir);
        self.working_dir.join(relative)
    }
}

/// Downloads a package with the registry client and unpacks it.
#[derive(Debug, Clone)]
pub struct PackageFetcher {
    registry_client: String,
    extractor: String,
    ignore_scripts: bool,
    max_output_bytes: usize,
}

impl Default for PackageFetcher {
    fn default() -> Self {
        Self::new("npm", "tar")
    }
}

impl PackageFetcher {
    /// Create a fetcher using the given registry client and extractor.
    pub fn new(registry_client: impl Into<String>, extractor: impl Into<String>) -> Self {
        Self {
            registry_client: registry_client.into(),
            extractor: extractor.into(),
            ignore_scripts: true,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Whether to pass `--ignore-scripts` to the registry client.
    #[must_use]
    pub fn with_ignore_scripts(mut self, ignore_scripts: bool) -> Self {
        self.ignore_scripts = ignore_scripts;
        self
    }

    /// Set the per-stream output ceiling for the registry client and
    /// extractor.
    #[must_use]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    /// The `pack` command for `spec`.
    fn pack_command(&self, spec: &str, working_dir: &Path) -> ToolCommand {
        let cmd = ToolCommand::new(&self.registry_client, working_dir)
            .arg("pack")
            .arg(spec);
        if self.ignore_scripts {
            cmd.arg("--ignore-scripts")
        } else {
            cmd
        }
    }

    /// Download `spec` into `working_dir` and extract it there.
    ///
    /// The package identifier is passed through unvalidated.
    ///
    /// # Errors
    ///
    /// - [`AuditError::AmbiguousExtraction`] if more than one new entry
    ///   appears.
    /// - [`AuditError::ExtractionNotFound`] if none appears.
    /// - [`AuditError::ArchiveNotReported`] if the registry client prints no
    ///   archive name.
    /// - Child-process errors from the registry client or the extractor.
    pub async fn fetch(&self, spec: &str, working_dir: &Path) -> AuditResult<PackageArtifact> {
        let before = snapshot(working_dir).await?;

        let pack = self.pack_command(spec, working_dir);
        let output = process::run(&pack, self.max_output_bytes).await?;
        let archive_name = archive_name_from_output(&output.stdout).ok_or_else(|| {
            AuditError::ArchiveNotReported {
                command: pack.display(),
            }
        })?;
        let archive = working_dir.join(&archive_name);
        info!(package = spec, archive = %archive.display(), "Package downloaded");

        let extract = ToolCommand::new(&self.extractor, working_dir)
            .arg("-xzf")
            .arg(&archive_name);
        process::run(&extract, self.max_output_bytes).await?;

        let after = snapshot(working_dir).await?;
        let archive_file = archive.file_name().unwrap_or_default();
        let entry = single_new_entry(&before, &after, archive_file)
            .map_err(|candidates| {
                if candidates.is_empty() {
                    AuditError::ExtractionNotFound {
                        archive: archive.clone(),
                        working_dir: working_dir.to_path_buf(),
                    }
                } else {
                    AuditError::AmbiguousExtraction { candidates }
                }
            })?;

        let extracted_dir = Path::new(".").join(entry);
        info!(extracted = %extracted_dir.display(), "Package extracted");

        Ok(PackageArtifact {
            working_dir: working_dir.to_path_buf(),
            archive,
            extracted_dir,
        })
    }
}

/// Last non-empty stdout line, trimmed.
fn archive_name_from_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Names of the entries directly under `dir`.
async fn snapshot(dir: &Path) -> AuditResult<BTreeSet<OsString>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AuditError::io(dir, e))?;
    let mut names = BTreeSet::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AuditError::io(dir, e))?
    {
        names.insert(entry.file_name());
    }
    debug!(dir = %dir.display(), entries = names.len(), "Directory snapshot");
    Ok(names)
}

/// The single entry in `after` but not in `before`, ignoring `archive`.
///
/// On failure returns every candidate found (empty when there were none).
fn single_new_entry(
    before: &BTreeSet<OsString>,
    after: &BTreeSet<OsString>,
    archive: &std::ffi::OsStr,
) -> Result<OsString, Vec<String>> {
    let mut new: Vec<&OsString> = after
        .difference(before)
        .filter(|name| name.as_os_str() != archive)
        .collect();

    match new.len() {
        1 => Ok(new.remove(0).clone()),
        _ => Err(new
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<OsString> {
        names.iter().map(OsString::from).collect()
    }

    #[test]
    fn archive_name_is_last_non_empty_line() {
        let stdout = "npm notice \nnpm notice package: pkg@1.0.0\npkg-1.0.0.tgz  \n\n";
        assert_eq!(archive_name_from_output(stdout).as_deref(), Some("pkg-1.0.0.tgz"));
        assert_eq!(archive_name_from_output("\n  \n"), None);
    }

    #[test]
    fn single_new_entry_ignores_archive_and_existing() {
        let before = set(&["notes.txt"]);
        let after = set(&["notes.txt", "pkg-1.0.0.tgz", "pkg-1.0.0"]);

        let entry = single_new_entry(&before, &after, "pkg-1.0.0.tgz".as_ref()).unwrap();
        assert_eq!(entry, OsString::from("pkg-1.0.0"));
    }

    #[test]
    fn multiple_new_entries_are_all_reported() {
        let before = set(&[]);
        let after = set(&["a.tgz", "package", "extra"]);

        let candidates = single_new_entry(&before, &after, "a.tgz".as_ref()).unwrap_err();
        assert_eq!(candidates, vec!["extra".to_string(), "package".to_string()]);
    }

    #[test]
    fn no_new_entry_reports_empty() {
        let before = set(&["a.tgz"]);
        let after = set(&["a.tgz"]);
        assert!(
            single_new_entry(&before, &after, "a.tgz".as_ref())
                .unwrap_err()
                .is_empty()
        );
    }

    #[test]
    fn package_root_strips_dot_prefix() {
        let artifact = PackageArtifact {
            working_dir: PathBuf::from("/work"),
            archive: PathBuf::from("/work/pkg-1.0.0.tgz"),
            extracted_dir: PathBuf::from("./pkg-1.0.0"),
        };
        assert_eq!(artifact.package_root(), PathBuf::from("/work/pkg-1.0.0"));
    }

    #[test]
    fn pack_command_skips_scripts_by_default() {
        let fetcher = PackageFetcher::default();
        let cmd = fetcher.pack_command("left-pad@1.3.0", Path::new("/work"));
        assert_eq!(cmd.arguments(), ["pack", "left-pad@1.3.0", "--ignore-scripts"]);

        let cmd = fetcher
            .with_ignore_scripts(false)
            .pack_command("left-pad", Path::new("/work"));
        assert_eq!(cmd.arguments(), ["pack", "left-pad"]);
    }
}
