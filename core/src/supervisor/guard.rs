//! Non-blocking start guard
//!
//! All start attempts, explicit and automatic, funnel through [`try_start`].
//! The guard serializes attempts with a try-lock: a caller that loses the
//! race gets [`StartOutcome::Busy`] back immediately instead of queueing.
//! The lock is scoped to this function, so every return path releases it.

use super::SupervisorInner;
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

/// What a start attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new helper process was spawned and observed running
    Started,
    /// The helper was already running; nothing was done
    AlreadyRunning,
    /// Another start attempt holds the lock; nothing was done
    Busy,
    /// The configuration forbids the start or names no usable executable
    ConfigInvalid,
    /// The OS refused the spawn, or the process died on arrival
    SpawnFailed,
}

impl StartOutcome {
    /// Whether the helper is running after this outcome
    pub fn is_running_after(&self) -> bool {
        matches!(self, StartOutcome::Started | StartOutcome::AlreadyRunning)
    }
}

/// Attempt to start the helper exactly once, without blocking
///
/// The sequence under the lock is: drop the stale process reference and the
/// previous start error, snapshot the current spec from the provider,
/// validate it, spawn, and verify the new process is actually up. The
/// snapshot happens inside the lock so a concurrent configuration change
/// cannot produce a start based on half-old state.
pub(crate) async fn try_start(inner: &SupervisorInner) -> StartOutcome {
    // Fast path, no lock needed
    if inner.handle.is_running() {
        return StartOutcome::AlreadyRunning;
    }

    let Ok(_guard) = inner.start_lock.try_lock() else {
        trace!("start attempt already in flight");
        return StartOutcome::Busy;
    };

    // Re-check under the lock: a concurrent attempt may have installed a
    // live process between the fast path and the acquire
    if inner.handle.is_running() {
        return StartOutcome::AlreadyRunning;
    }

    inner.handle.clear_stale();

    let spec = inner.provider.snapshot();

    if !spec.startup_policy.allows_explicit_start() {
        warn!("start request refused: startup policy is 'never'");
        inner
            .handle
            .record_error("startup policy forbids starting the helper");
        return StartOutcome::ConfigInvalid;
    }

    if spec.executable.trim().is_empty() {
        debug!("start skipped: no helper executable configured");
        inner.handle.record_error("helper executable is not configured");
        return StartOutcome::ConfigInvalid;
    }

    if !Path::new(&spec.executable).is_file() {
        warn!("helper executable '{}' does not exist", spec.executable);
        inner.handle.record_error(format!(
            "helper executable '{}' does not exist",
            spec.executable
        ));
        return StartOutcome::ConfigInvalid;
    }

    let parent_arg = format!("parent:{}", std::process::id());
    match inner.spawner.spawn(&spec, &parent_arg).await {
        Ok(process) => {
            let pid = process.pid();
            if inner.handle.install(process) {
                info!("Started helper '{}' with pid {}", spec.executable, pid);
                StartOutcome::Started
            } else {
                warn!("Helper '{}' (pid {}) exited immediately", spec.executable, pid);
                StartOutcome::SpawnFailed
            }
        }
        Err(e) => {
            error!("Failed to spawn helper '{}': {}", spec.executable, e);
            inner.handle.record_error(e.to_string());
            StartOutcome::SpawnFailed
        }
    }
}
