//! Fetch and extraction against fake registry and extractor programs.

use std::path::{Path, PathBuf};

use hookscope_audit::{AuditError, PackageFetcher};
use hookscope_test::FakeToolbox;

fn fetcher(npm: &Path, tar: &Path) -> PackageFetcher {
    PackageFetcher::new(npm.display().to_string(), tar.display().to_string())
}

#[tokio::test]
async fn single_new_entry_is_the_extracted_dir() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("unrelated.txt"), "kept").unwrap();

    let npm = tools.registry_client("pkg-1.0.0.tgz");
    let tar = tools.extractor(&["pkg-1.0.0"]);

    let artifact = fetcher(&npm, &tar)
        .fetch("pkg@1.0.0", work.path())
        .await
        .unwrap();

    assert_eq!(artifact.extracted_dir, PathBuf::from("./pkg-1.0.0"));
    assert_eq!(artifact.archive, work.path().join("pkg-1.0.0.tgz"));
    assert_eq!(artifact.package_root(), work.path().join("pkg-1.0.0"));
    assert!(artifact.archive.exists(), "archive is not cleaned up");
}

#[tokio::test]
async fn several_new_entries_are_ambiguous() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();

    let npm = tools.registry_client("pkg-1.0.0.tgz");
    let tar = tools.extractor(&["package", "pkg-1.0.0", "stray"]);

    let err = fetcher(&npm, &tar)
        .fetch("pkg", work.path())
        .await
        .unwrap_err();

    match err {
        AuditError::AmbiguousExtraction { candidates } => {
            assert_eq!(candidates, vec!["package", "pkg-1.0.0", "stray"]);
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn extraction_into_existing_dir_is_not_found() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    std::fs::create_dir(work.path().join("package")).unwrap();

    let npm = tools.registry_client("pkg-1.0.0.tgz");
    let tar = tools.extractor(&["package"]);

    let err = fetcher(&npm, &tar)
        .fetch("pkg", work.path())
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::ExtractionNotFound { .. }));
}

#[tokio::test]
async fn registry_failure_carries_stderr() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();

    let npm = tools.failing("npm-404", "npm ERR! 404 Not Found - GET https://registry/nope", 1);
    let tar = tools.extractor(&[]);

    let err = fetcher(&npm, &tar)
        .fetch("nope", work.path())
        .await
        .unwrap_err();

    assert!(err.is_child_process_failure());
    assert!(err.to_string().contains("404 Not Found"));
}

#[tokio::test]
async fn silent_registry_client_is_rejected() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();

    let npm = tools.script("npm-silent", "exit 0");
    let tar = tools.extractor(&["package"]);

    let err = fetcher(&npm, &tar)
        .fetch("pkg", work.path())
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::ArchiveNotReported { .. }));
}

#[tokio::test]
async fn extractor_failure_is_propagated() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();

    // Reports an archive name without creating the file.
    let npm = tools.script("npm-liar", "echo ghost-1.0.0.tgz");
    let tar = tools.extractor(&["package"]);

    let err = fetcher(&npm, &tar)
        .fetch("ghost", work.path())
        .await
        .unwrap_err();

    match err {
        AuditError::ChildProcess { exit_code, stderr, .. } => {
            assert_eq!(exit_code, Some(2));
            assert!(stderr.contains("Cannot open"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_registry_client_is_spawn_failure() {
    let work = tempfile::tempdir().unwrap();
    let err = PackageFetcher::new("hookscope-no-such-npm", "tar")
        .fetch("pkg", work.path())
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::SpawnFailed { .. }));
}
