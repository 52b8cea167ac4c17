//! Fake external programs and manifest fixtures.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Quote `s` for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Build a `package.json` body with the given scripts.
#[must_use]
pub fn manifest_json(name: &str, version: &str, scripts: &[(&str, &str)]) -> String {
    let scripts: serde_json::Map<String, serde_json::Value> = scripts
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::json!({
        "name": name,
        "version": version,
        "scripts": scripts,
    })
    .to_string()
}

/// A temp directory of executable shell scripts standing in for the
/// external programs.
///
/// Scripts live until the toolbox is dropped.
#[derive(Debug)]
pub struct FakeToolbox {
    dir: TempDir,
}

impl Default for FakeToolbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeToolbox {
    /// Create an empty toolbox.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create toolbox dir"),
        }
    }

    /// Directory holding the scripts.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `/bin/sh` script named `name` and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the script cannot be written.
    #[must_use]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
        path
    }

    /// Registry client that creates `archive_name` in its working directory
    /// and prints it as the last stdout line, after some notice noise.
    #[must_use]
    pub fn registry_client(&self, archive_name: &str) -> PathBuf {
        let archive = shell_quote(archive_name);
        self.script(
            "fake-npm-pack",
            &format!(
                "echo \"npm notice package: $2\" >&2\n\
                 echo 'npm notice'\n\
                 : > {archive}\n\
                 echo {archive}\n\
                 echo"
            ),
        )
    }

    /// Extractor that checks the archive exists and creates one directory
    /// per entry.
    #[must_use]
    pub fn extractor(&self, entries: &[&str]) -> PathBuf {
        let mut body = String::from(
            "[ -f \"$2\" ] || { echo \"tar: $2: Cannot open\" >&2; exit 2; }\n",
        );
        for entry in entries {
            body.push_str(&format!("mkdir -p {}\n", shell_quote(entry)));
        }
        self.script("fake-tar", &body)
    }

    /// Extractor that creates `dir` containing `package.json` with
    /// `manifest`.
    #[must_use]
    pub fn extractor_with_package(&self, dir: &str, manifest: &str) -> PathBuf {
        let dir = shell_quote(dir);
        self.script(
            "fake-tar-package",
            &format!(
                "[ -f \"$2\" ] || {{ echo \"tar: $2: Cannot open\" >&2; exit 2; }}\n\
                 mkdir -p {dir}\n\
                 cat > {dir}/package.json <<'HOOKSCOPE_EOF'\n\
                 {manifest}\n\
                 HOOKSCOPE_EOF"
            ),
        )
    }

    /// Package manager that prints `stdout` and exits with `exit_code`.
    #[must_use]
    pub fn package_manager(&self, stdout: &str, exit_code: i32) -> PathBuf {
        self.script(
            "fake-npm-install",
            &format!("echo {}\nexit {exit_code}", shell_quote(stdout)),
        )
    }

    /// Tracer that accepts strace's flags, writes `<prefix>.<pid>` for the
    /// traced shell plus `<prefix>.argv` with its own arguments, then execs
    /// the command.
    #[must_use]
    pub fn tracer(&self) -> PathBuf {
        self.script(
            "fake-strace",
            r#"all="$*"
prefix=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) prefix="$2"; shift 2 ;;
    -e|-s) shift 2 ;;
    -ff|-f|-ttt) shift ;;
    *) break ;;
  esac
done
[ -n "$prefix" ] || { echo "fake-strace: missing -o" >&2; exit 1; }
echo "$all" > "$prefix.argv"
echo "0.000001 execve(\"/bin/sh\", [\"sh\", \"-c\"], 0x0 /* env */) = 0" > "$prefix.$$"
exec "$@""#,
        )
    }

    /// Program that prints `stderr` to standard error and exits with `code`.
    #[must_use]
    pub fn failing(&self, name: &str, stderr: &str, code: i32) -> PathBuf {
        self.script(
            name,
            &format!("echo {} >&2\nexit {code}", shell_quote(stderr)),
        )
    }
}
