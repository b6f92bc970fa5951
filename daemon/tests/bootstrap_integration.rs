//! Integration tests for daemon bootstrap functionality

use std::time::Duration;
// Silence unused crate dependency lints for workspace-wide deps
use clap as _;
use tracing as _;

use daemon::{bootstrap, DaemonError};
use outrigger_core::StartOutcome;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("outrigger.toml");
    std::fs::write(&path, contents).expect("write config");
    (dir, path)
}

#[tokio::test]
async fn bootstrap_start_stop() {
    let timeout = Duration::from_secs(30);
    tokio::time::timeout(timeout, async {
        let (_dir, path) = write_config(
            r#"
            [helper]
            executable = "/bin/sh"
            args = ["-c", "sleep 30"]
            startupPolicy = "delayed"

            [supervisor]
            terminateOnShutdown = true
            gracefulTimeoutSecs = 2
            "#,
        );

        let boot = bootstrap(Some(path)).await.expect("bootstrap should succeed");

        // Delayed: the poll loop must not start the helper on its own
        tokio::time::sleep(Duration::from_millis(150)).await;
        boot.supervisor.tick();
        assert!(!boot.supervisor.is_running());

        assert_eq!(boot.supervisor.try_start().await, StartOutcome::Started);
        assert!(boot.supervisor.is_running());
        assert!(boot.supervisor.pid().is_some());

        boot.shutdown().await;
    })
    .await
    .expect("test timed out after 30s");
}

#[tokio::test]
async fn bootstrap_without_config_idles_until_configured() {
    let boot = bootstrap(None).await.expect("bootstrap with defaults");

    assert!(!boot.supervisor.is_running());
    // Nothing to start: no helper executable was configured
    assert_eq!(
        boot.supervisor.try_start().await,
        StartOutcome::ConfigInvalid
    );

    boot.shutdown().await;
}

#[tokio::test]
async fn bootstrap_rejects_missing_config_file() {
    let result = bootstrap(Some("/does/not/exist/outrigger.toml".into())).await;
    match result {
        Err(DaemonError::ConfigError(msg)) => {
            assert!(msg.contains("/does/not/exist"), "unexpected message: {msg}");
        }
        other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn bootstrap_rejects_invalid_config() {
    let (_dir, path) = write_config(
        r#"
        [supervisor]
        pollIntervalMs = 0
        "#,
    );

    let result = bootstrap(Some(path)).await;
    match result {
        Err(DaemonError::ConfigError(msg)) => {
            assert!(
                msg.contains("supervisor.pollIntervalMs"),
                "unexpected message: {msg}"
            );
        }
        other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
    }
}
