//! End-to-end supervisor runs against a scripted stand-in for Unity.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use unity_proxy::config::ProxyConfig;
use unity_proxy::status::{MemorySink, StatusEvent};
use unity_proxy::supervisor::{RunRequest, Supervisor, SupervisorError, PID_PARAMETER};

/// Write an executable script. Unity is called as `<script> -logFile <path> ...`,
/// so the log path is `$2`.
fn fake_unity(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("Unity");
    std::fs::write(&path, format!("#!/bin/sh\nlog=\"$2\"\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn fast_config() -> ProxyConfig {
    ProxyConfig {
        poll_interval_ms: 20,
        ..ProxyConfig::default()
    }
}

#[tokio::test]
async fn successful_build() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"echo "DisplayProgressbar: Compiling Scripts" >> "$log"
sleep 0.1
echo "DisplayProgressbar: Building Player" >> "$log"
echo "Exiting batchmode successfully now!" >> "$log"
exit 0"#,
    );
    let log_file = dir.path().join("unity.log");
    let sink = Arc::new(MemorySink::new());
    let supervisor = Supervisor::new(fast_config(), sink.clone());

    let outcome = supervisor
        .run(RunRequest::new(&unity).args(["-batchmode", "-quit"]).log_file(&log_file))
        .await
        .unwrap();

    assert!(outcome.verdict.ok);
    assert_eq!(outcome.verdict.exit_code, 0);
    assert_eq!(outcome.child_exit_code, 0);
    assert_eq!(outcome.log_file, Some(log_file));
    assert!(outcome.artifact.is_none());

    assert_eq!(
        sink.progress_names(),
        vec!["Compiling Scripts", "Building Player"]
    );
    let events = sink.events();
    assert!(events.iter().any(
        |e| matches!(e, StatusEvent::SetParameter { name, .. } if name == PID_PARAMETER)
    ));
    assert_eq!(events.last(), Some(&StatusEvent::Finished { ok: true }));
    assert!(sink.output().contains("Starting Unity with arguments:"));
    assert!(sink.output().contains("Exiting batchmode successfully now!"));
}

#[tokio::test]
async fn compiler_error_fails_build_with_exit_code_one() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"echo "Assets/Scripts/CommandLine.cs(88,63): ERROR: CS0103: The name 'WebUtility' does not exist in the current context" >> "$log"
echo "Exiting batchmode successfully now!" >> "$log"
exit 0"#,
    );
    let sink = Arc::new(MemorySink::new());
    let supervisor = Supervisor::new(fast_config(), sink.clone());

    let outcome = supervisor
        .run(RunRequest::new(&unity).log_file(dir.path().join("unity.log")))
        .await
        .unwrap();

    assert!(!outcome.verdict.ok);
    assert_eq!(outcome.verdict.exit_code, 1);
    assert_eq!(
        outcome.failure.reason(),
        Some("CS0103: The name 'WebUtility' does not exist in the current context")
    );
    assert_eq!(sink.problems().len(), 1);
    assert_eq!(
        sink.events().last(),
        Some(&StatusEvent::Finished { ok: false })
    );
}

#[tokio::test]
async fn child_exit_code_passes_through() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(dir.path(), r#"echo "Aborting batchmode" >> "$log"; exit 3"#);
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(RunRequest::new(&unity).log_file(dir.path().join("unity.log")))
        .await
        .unwrap();

    assert!(!outcome.verdict.ok);
    assert_eq!(outcome.child_exit_code, 3);
    assert_eq!(outcome.verdict.exit_code, 3);
}

#[tokio::test]
async fn missing_success_marker_fails_with_zero() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(dir.path(), r#"echo "done?" >> "$log"; exit 0"#);
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(RunRequest::new(&unity).log_file(dir.path().join("unity.log")))
        .await
        .unwrap();

    assert!(!outcome.verdict.ok);
    assert_eq!(outcome.verdict.exit_code, 0);
}

#[tokio::test]
async fn output_written_just_before_exit_is_not_lost() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"printf 'Exiting batchmode successfully now!' >> "$log"; exit 0"#,
    );
    // Within an hour-long interval only the first poll and the final drain run.
    let config = ProxyConfig {
        poll_interval_ms: 3_600_000,
        ..ProxyConfig::default()
    };
    let supervisor = Supervisor::new(config, Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(RunRequest::new(&unity).log_file(dir.path().join("unity.log")))
        .await
        .unwrap();

    assert!(outcome.verdict.ok);
}

#[tokio::test]
async fn artifacts_receive_full_log() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"printf 'line one\nExiting batchmode successfully now!\n' >> "$log"; exit 0"#,
    );
    let artifacts = dir.path().join("artifacts").join("logs");
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(
            RunRequest::new(&unity)
                .log_file(dir.path().join("unity.log"))
                .artifacts_dir(&artifacts),
        )
        .await
        .unwrap();

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact, artifacts.join("editor.log"));
    assert_eq!(
        std::fs::read_to_string(artifact).unwrap(),
        "line one\nExiting batchmode successfully now!\n"
    );
}

#[tokio::test]
async fn forwarded_arguments_reach_unity() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"shift 2
for arg in "$@"; do echo "arg: $arg" >> "$log"; done
echo "Exiting batchmode successfully now!" >> "$log""#,
    );
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));
    let log_file = dir.path().join("unity.log");

    supervisor
        .run(
            RunRequest::new(&unity)
                .args(["-executeMethod", "Builder.Build", "with space"])
                .log_file(&log_file),
        )
        .await
        .unwrap();

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.starts_with("arg: -executeMethod\narg: Builder.Build\narg: with space\n"));
}

#[tokio::test]
async fn invalid_log_bytes_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"printf 'ok\n\377\376 garbage\n' >> "$log"
exec sleep 30"#,
    );
    let config = ProxyConfig {
        terminate_timeout_secs: 1,
        ..fast_config()
    };
    let supervisor = Supervisor::new(config, Arc::new(MemorySink::new()));

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(20),
        supervisor.run(RunRequest::new(&unity).log_file(dir.path().join("unity.log"))),
    )
    .await
    .expect("watcher failure must end the run without waiting for Unity");

    assert!(matches!(result, Err(SupervisorError::Watcher(_))));
}

#[tokio::test]
async fn log_left_by_an_earlier_run_does_not_count() {
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("unity.log");
    std::fs::write(&log_file, "previous run\nExiting batchmode successfully now!\n").unwrap();
    let unity = fake_unity(
        dir.path(),
        r#": > "$log"
echo "Aborted early" >> "$log"
exit 0"#,
    );
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(RunRequest::new(&unity).log_file(&log_file))
        .await
        .unwrap();

    assert!(!outcome.verdict.ok);
    assert_eq!(outcome.verdict.exit_code, 0);
    assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "Aborted early\n");
}

#[tokio::test]
async fn temporary_log_is_removed_after_the_run() {
    let dir = TempDir::new().unwrap();
    let unity = fake_unity(
        dir.path(),
        r#"echo "$log" > "$(dirname "$0")/log-path"
echo "Exiting batchmode successfully now!" >> "$log""#,
    );
    let artifacts = dir.path().join("artifacts");
    let supervisor = Supervisor::new(fast_config(), Arc::new(MemorySink::new()));

    let outcome = supervisor
        .run(RunRequest::new(&unity).artifacts_dir(&artifacts))
        .await
        .unwrap();

    assert!(outcome.verdict.ok);
    assert!(outcome.log_file.is_none());
    let temp_log = std::fs::read_to_string(dir.path().join("log-path")).unwrap();
    assert!(!Path::new(temp_log.trim_end()).exists());
    assert_eq!(
        std::fs::read_to_string(artifacts.join("editor.log")).unwrap(),
        "Exiting batchmode successfully now!\n"
    );
}
