//! Package manifest (`package.json`) model.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};

/// Manifest file name inside an extracted package.
pub const MANIFEST_FILE: &str = "package.json";

/// The parts of a package manifest the auditor reads.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package name.
    #[serde(default)]
    pub name: Option<String>,
    /// Package version.
    #[serde(default)]
    pub version: Option<String>,
    /// Script name → shell command.
    #[serde(default)]
    pub scripts: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// Parse a manifest from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the text is not a valid manifest.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read `package.json` from `package_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be read and
    /// [`AuditError::ManifestParse`] if it is not valid JSON.
    pub async fn load(package_dir: &Path) -> AuditResult<Self> {
        let path = package_dir.join(MANIFEST_FILE);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AuditError::io(&path, e))?;
        Self::from_json_str(&raw).map_err(|source| AuditError::ManifestParse { path, source })
    }

    /// `name@version`, or whichever half is known.
    #[must_use]
    pub fn display_id(&self) -> Option<String> {
        match (&self.name, &self.version) {
            (Some(n), Some(v)) => Some(format!("{n}@{v}")),
            (Some(n), None) => Some(n.clone()),
            (None, Some(v)) => Some(v.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_real_world_manifest() {
        let manifest = Manifest::from_json_str(
            r#"{
                "name": "left-pad",
                "version": "1.3.0",
                "main": "index.js",
                "scripts": { "test": "node test.js", "postinstall": "node setup.js" },
                "dependencies": {}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.name.as_deref(), Some("left-pad"));
        assert_eq!(manifest.display_id().as_deref(), Some("left-pad@1.3.0"));
        assert_eq!(manifest.scripts.unwrap().len(), 2);
    }

    #[test]
    fn empty_object_is_valid() {
        let manifest = Manifest::from_json_str("{}").unwrap();
        assert_eq!(manifest, Manifest::default());
        assert!(manifest.display_id().is_none());
    }

    #[tokio::test]
    async fn load_reads_package_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), r#"{"name":"pkg"}"#).unwrap();

        let manifest = Manifest::load(dir.path()).await.unwrap();
        assert_eq!(manifest.name.as_deref(), Some("pkg"));
    }

    #[tokio::test]
    async fn load_reports_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Manifest::load(dir.path()).await,
            Err(AuditError::Io { .. })
        ));

        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        assert!(matches!(
            Manifest::load(dir.path()).await,
            Err(AuditError::ManifestParse { .. })
        ));
    }
}
