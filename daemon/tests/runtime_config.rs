//! Integration tests for daemon runtime reconfiguration
//!
//! The bootstrap handle exposes the shared provider, so a host can change
//! the helper spec while the daemon runs. The supervisor must act on the new
//! value on its next cycle without being restarted.

use std::time::Duration;
// Silence unused crate dependency lints for workspace-wide deps
use clap as _;
use tracing as _;

use daemon::bootstrap;
use outrigger_core::{StartOutcome, StartupPolicy};

async fn wait_until(mut condition: impl FnMut() -> bool, deadline: Duration) -> bool {
    let started = tokio::time::Instant::now();
    while started.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn policy_flip_at_runtime_brings_the_helper_up() {
    let timeout = Duration::from_secs(30);
    tokio::time::timeout(timeout, async {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outrigger.toml");
        std::fs::write(
            &path,
            r#"
            [helper]
            executable = "/bin/sh"
            args = ["-c", "sleep 30"]
            startupPolicy = "never"

            [supervisor]
            terminateOnShutdown = true
            gracefulTimeoutSecs = 2
            "#,
        )
        .expect("write config");

        let boot = bootstrap(Some(path)).await.expect("bootstrap");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!boot.supervisor.is_running());
        assert_eq!(
            boot.supervisor.try_start().await,
            StartOutcome::ConfigInvalid
        );

        // The poll loop picks the new policy up on its next cycle
        boot.provider
            .update(|spec| spec.startup_policy = StartupPolicy::Automatic);
        assert!(
            wait_until(|| boot.supervisor.is_running(), Duration::from_secs(5)).await,
            "helper should come up after the policy flip"
        );

        boot.shutdown().await;
    })
    .await
    .expect("test timed out after 30s");
}

#[tokio::test]
async fn executable_set_at_runtime_is_used_on_the_next_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("outrigger.toml");
    std::fs::write(
        &path,
        r#"
        [helper]
        startupPolicy = "delayed"

        [supervisor]
        terminateOnShutdown = true
        gracefulTimeoutSecs = 2
        "#,
    )
    .expect("write config");

    let boot = bootstrap(Some(path)).await.expect("bootstrap");

    // Nothing configured yet
    assert_eq!(
        boot.supervisor.try_start().await,
        StartOutcome::ConfigInvalid
    );

    boot.provider.update(|spec| {
        spec.executable = "/bin/sh".to_string();
        spec.args = vec!["-c".to_string(), "sleep 30".to_string()];
    });
    assert_eq!(boot.supervisor.try_start().await, StartOutcome::Started);
    assert!(boot.supervisor.is_running());

    boot.shutdown().await;
}
