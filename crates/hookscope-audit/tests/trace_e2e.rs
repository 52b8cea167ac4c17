//! Traced execution, with a fake tracer and, when usable, the real `strace`.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use hookscope_audit::{
    AuditError, OutputStream, TraceOptions, TraceRequest, TracedExecutor, collect_trace_files,
};
use hookscope_test::FakeToolbox;

fn fake_executor(tracer: &Path, max_output_bytes: usize) -> TracedExecutor {
    TracedExecutor::new(TraceOptions {
        tracer: tracer.display().to_string(),
        max_output_bytes,
        ..TraceOptions::default()
    })
}

/// Returns `true` when `strace` is installed and allowed to ptrace here.
fn strace_usable() -> bool {
    which::which("strace").is_ok()
        && Command::new("strace")
            .args(["-o", "/dev/null", "true"])
            .status()
            .is_ok_and(|s| s.success())
}

#[tokio::test]
async fn fake_tracer_receives_strace_flags() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    let executor = fake_executor(&tools.tracer(), 1_048_576);

    let request = TraceRequest::new("echo hello", work.path(), "traces/postinstall");
    let result = executor.execute(&request).await.unwrap();

    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.trace_files.len(), 1);
    assert!(result.trace_files[0].path.starts_with(work.path().join("traces")));

    let argv = std::fs::read_to_string(work.path().join("traces/postinstall.argv")).unwrap();
    let prefix = work.path().join("traces/postinstall");
    assert_eq!(
        argv.trim(),
        format!(
            "-ff -o {} -e trace=file,network -s 8192 -ttt sh -c echo hello",
            prefix.display()
        )
    );
}

#[tokio::test]
async fn env_reaches_the_traced_command() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    let executor = fake_executor(&tools.tracer(), 1_048_576);

    let request = TraceRequest::new("printf %s \"$npm_lifecycle_event\"", work.path(), "t/hook")
        .env("npm_lifecycle_event", "install");
    let result = executor.execute(&request).await.unwrap();

    assert_eq!(result.stdout, "install");
}

#[tokio::test]
async fn stale_trace_files_are_not_reported() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    std::fs::create_dir(work.path().join("traces")).unwrap();
    std::fs::write(work.path().join("traces/install.1"), "old run").unwrap();

    let executor = fake_executor(&tools.tracer(), 1_048_576);
    let request = TraceRequest::new("true", work.path(), "traces/install");
    let result = executor.execute(&request).await.unwrap();

    assert_eq!(result.trace_files.len(), 1);
    assert_ne!(result.trace_files[0].pid, 1);

    let all = collect_trace_files(&work.path().join("traces/install"))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn failing_hook_is_fatal_with_stderr() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    let executor = fake_executor(&tools.tracer(), 1_048_576);

    let request = TraceRequest::new("echo nope >&2; exit 7", work.path(), "traces/preinstall");
    let err = executor.execute(&request).await.unwrap_err();

    match err {
        AuditError::ChildProcess { exit_code, stderr, .. } => {
            assert_eq!(exit_code, Some(7));
            assert!(stderr.contains("nope"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stdout_past_ceiling_fails() {
    let tools = FakeToolbox::new();
    let work = tempfile::tempdir().unwrap();
    let executor = fake_executor(&tools.tracer(), 4096);

    let request = TraceRequest::new("head -c 100000 /dev/zero", work.path(), "traces/install");
    let err = executor.execute(&request).await.unwrap_err();

    assert!(matches!(
        err,
        AuditError::OutputOverflow {
            stream: OutputStream::Stdout,
            limit: 4096,
            ..
        }
    ));
}

#[tokio::test]
async fn missing_tracer_is_spawn_failure() {
    let work = tempfile::tempdir().unwrap();
    let executor = TracedExecutor::new(TraceOptions {
        tracer: "hookscope-no-such-strace".into(),
        ..TraceOptions::default()
    });

    let err = executor
        .execute(&TraceRequest::new("true", work.path(), "t/x"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::SpawnFailed { .. }));
}

#[tokio::test]
async fn real_strace_traces_every_process() {
    if !strace_usable() {
        eprintln!("strace not usable, skipping");
        return;
    }

    let work = tempfile::tempdir().unwrap();
    let executor = TracedExecutor::default();
    let command = "echo traced-marker; echo data > out.txt; cat out.txt > /dev/null; sleep 0.2";
    let request = TraceRequest::new(command, work.path(), "traces/postinstall");

    let started = Instant::now();
    let result = executor.execute(&request).await.unwrap();
    let observed = started.elapsed();

    assert_eq!(result.stdout, "traced-marker\n");
    assert!(result.runtime >= Duration::from_millis(200));
    assert!(result.runtime <= observed);
    // At least the shell and the forked `cat`.
    assert!(result.trace_files.len() >= 2, "{:?}", result.trace_files);
    assert!(result.trace_files.windows(2).all(|w| w[0].pid < w[1].pid));

    let traced = result
        .trace_files
        .iter()
        .map(|f| std::fs::read_to_string(&f.path).unwrap())
        .collect::<String>();
    assert!(traced.contains("out.txt"));
}

#[tokio::test]
async fn real_strace_overflow_fails() {
    if !strace_usable() {
        eprintln!("strace not usable, skipping");
        return;
    }

    let work = tempfile::tempdir().unwrap();
    let executor = TracedExecutor::new(TraceOptions {
        max_output_bytes: 1024,
        ..TraceOptions::default()
    });
    let request = TraceRequest::new("head -c 65536 /dev/zero", work.path(), "traces/install");

    let err = executor.execute(&request).await.unwrap_err();
    assert!(matches!(err, AuditError::OutputOverflow { .. }));
}
