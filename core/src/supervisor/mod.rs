//! Helper process supervisor
//!
//! This module keeps a single external helper process alive. A background
//! poll loop checks liveness on a fixed interval and starts the helper when
//! the configured policy allows it; explicit start requests go through the
//! same non-blocking guard, so concurrent callers can never double-spawn.
//!
//! ## Architecture
//!
//! ```text
//! Supervisor (facade)
//!   ├── tick() ── keeps the poll loop task alive, respawning it with
//!   │             exponential backoff if it ever dies
//!   ├── poll loop ── snapshot spec → not running? → try_start
//!   └── try_start ── try-lock guard → validate → spawn → install
//! ```
//!
//! ## Components
//!
//! - [`Supervisor`]: constructed facade owning the loop task and the handle
//! - [`StartOutcome`]: what a start attempt did
//! - [`Spawner`]: trait for launching the helper, mocked in tests
//! - `HelperHandle`: internal slot holding the live process reference

use crate::provider::ConfigProvider;
use schema::{HelperStatus, SupervisorSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub mod guard;
mod handle;
mod loop_task;
pub mod spawn;

#[cfg(test)]
pub mod integration_tests;

pub use guard::*;
pub use spawn::*;

use handle::HelperHandle;
use loop_task::RespawnBackoff;

/// Shared state behind the facade
///
/// The poll loop task and the facade both hold this through an `Arc`.
pub(crate) struct SupervisorInner {
    pub(crate) provider: Arc<dyn ConfigProvider>,
    pub(crate) spawner: Arc<dyn Spawner>,
    pub(crate) settings: SupervisorSettings,
    pub(crate) handle: HelperHandle,
    /// Serializes start attempts; acquired with `try_lock` only
    pub(crate) start_lock: tokio::sync::Mutex<()>,
    pub(crate) cancel: CancellationToken,
}

/// Bookkeeping for the supervised poll loop task
#[derive(Default)]
struct TickState {
    loop_task: Option<JoinHandle<()>>,
    /// Earliest instant the next respawn may happen
    respawn_at: Option<tokio::time::Instant>,
    /// When the current loop task was spawned
    spawned_at: Option<tokio::time::Instant>,
    /// Consecutive loop deaths since the last stable run
    attempts: u32,
    gave_up: bool,
}

/// Facade for supervising one external helper process
///
/// Construct one per helper. The poll loop task is not spawned at
/// construction time; the first call to [`Supervisor::tick`] (or any method
/// that ticks internally) spawns it, so construction itself does not require
/// a running tokio runtime.
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
    tick_state: std::sync::Mutex<TickState>,
    backoff: RespawnBackoff,
}

impl Supervisor {
    /// Create a supervisor for the helper described by `provider`
    pub fn new(
        provider: Arc<dyn ConfigProvider>,
        spawner: Arc<dyn Spawner>,
        settings: SupervisorSettings,
    ) -> Self {
        let backoff = RespawnBackoff::from_settings(&settings);
        let inner = Arc::new(SupervisorInner {
            provider,
            spawner,
            settings,
            handle: HelperHandle::new(),
            start_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
        });
        Self {
            inner,
            tick_state: std::sync::Mutex::new(TickState::default()),
            backoff,
        }
    }

    /// Make sure the poll loop task is alive
    ///
    /// Spawns the loop on first call. If the loop task has died, schedules a
    /// respawn with exponential backoff and performs it once the delay has
    /// passed; after too many consecutive deaths the supervisor gives up and
    /// logs an error. Cheap enough to call on every host heartbeat.
    ///
    /// Must be called from within a tokio runtime.
    pub fn tick(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        let mut state = self.lock_tick_state();
        if state.gave_up {
            return;
        }

        if let Some(task) = &state.loop_task {
            if !task.is_finished() {
                // A long stable run clears the death counter
                if state.attempts > 0
                    && state
                        .spawned_at
                        .is_some_and(|at| at.elapsed() >= self.inner.settings.respawn_max_delay())
                {
                    debug!("Poll loop stable; resetting respawn attempt counter");
                    state.attempts = 0;
                }
                return;
            }

            // The loop task never returns on its own while the token is
            // uncancelled, so a finished task here means it died
            state.loop_task = None;
            state.attempts += 1;
            if state.attempts > self.inner.settings.max_respawn_attempts {
                error!(
                    "Poll loop died {} times in a row; giving up on respawning it",
                    state.attempts
                );
                state.gave_up = true;
                return;
            }
            let delay = self.backoff.delay_for(state.attempts);
            warn!(
                "Poll loop died; respawn attempt {} scheduled in {:?}",
                state.attempts, delay
            );
            state.respawn_at = Some(tokio::time::Instant::now() + delay);
            return;
        }

        if let Some(respawn_at) = state.respawn_at {
            if tokio::time::Instant::now() < respawn_at {
                return;
            }
            state.respawn_at = None;
        }

        debug!("Spawning helper poll loop");
        state.spawned_at = Some(tokio::time::Instant::now());
        state.loop_task = Some(tokio::spawn(loop_task::run_poll_loop(Arc::clone(
            &self.inner,
        ))));
    }

    /// Whether the helper is currently running
    ///
    /// Ticks the supervisor as a side effect, then reports the last-known
    /// state of the process reference. Never blocks.
    pub fn is_running(&self) -> bool {
        self.tick();
        self.inner.handle.is_running()
    }

    /// Request a start and report whether the helper runs afterwards
    ///
    /// Collapses the detailed [`StartOutcome`] into a bool: `true` for
    /// `Started` and `AlreadyRunning`, `false` for everything else. Callers
    /// that need to distinguish a lost race from a failed spawn should use
    /// [`Supervisor::try_start`] instead.
    pub async fn start(&self) -> bool {
        self.try_start().await.is_running_after()
    }

    /// Request a start and report what happened
    pub async fn try_start(&self) -> StartOutcome {
        self.tick();
        guard::try_start(&self.inner).await
    }

    /// PID of the current process reference, if any
    pub fn pid(&self) -> Option<u32> {
        self.inner.handle.pid()
    }

    /// Most recent start error, if the last attempt failed
    pub fn last_error(&self) -> Option<String> {
        self.inner.handle.last_error()
    }

    /// Fresh status snapshot
    pub fn status(&self) -> HelperStatus {
        self.inner.handle.status()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<HelperStatus> {
        self.inner.handle.subscribe()
    }

    /// Stop the poll loop and, when configured, the helper itself
    ///
    /// Cancels the loop task and waits for it to finish. With
    /// `terminate_on_shutdown` set the helper's process group receives
    /// SIGTERM, escalating to SIGKILL after the graceful timeout; otherwise
    /// the helper is left running detached. Idempotent.
    pub async fn shutdown(&self) {
        info!("Supervisor shutting down");
        self.inner.cancel.cancel();

        let task = {
            let mut state = self.lock_tick_state();
            state.respawn_at = None;
            state.loop_task.take()
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Poll loop task ended abnormally: {}", e);
            }
        }

        if self.inner.settings.terminate_on_shutdown {
            if let Some(process) = self.inner.handle.take_process() {
                terminate_helper(process, self.inner.settings.graceful_timeout()).await;
            }
        } else if let Some(pid) = self.inner.handle.pid() {
            info!("Leaving helper {} running detached", pid);
        }
    }

    fn lock_tick_state(&self) -> std::sync::MutexGuard<'_, TickState> {
        self.tick_state.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn loop_alive(&self) -> bool {
        self.lock_tick_state()
            .loop_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    #[cfg(test)]
    pub(crate) fn abort_loop_for_test(&self) {
        if let Some(task) = self.lock_tick_state().loop_task.as_ref() {
            task.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn gave_up(&self) -> bool {
        self.lock_tick_state().gave_up
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Stops the loop task even when the host never called shutdown
        self.inner.cancel.cancel();
    }
}

/// Gracefully terminate the helper, escalating to SIGKILL on timeout
async fn terminate_helper(mut process: Box<dyn SpawnedProcess>, graceful_timeout: Duration) {
    let pid = process.pid();
    if !process.is_alive() {
        debug!("Helper {} already exited", pid);
        return;
    }

    info!(
        "Terminating helper {} (graceful timeout {:?})",
        pid, graceful_timeout
    );
    if let Err(e) = process.terminate() {
        warn!("Failed to signal helper {}: {}", pid, e);
    }

    let deadline = tokio::time::Instant::now() + graceful_timeout;
    while tokio::time::Instant::now() < deadline {
        if !process.is_alive() {
            info!("Helper {} exited gracefully", pid);
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    warn!(
        "Helper {} did not exit within {:?}, using SIGKILL",
        pid, graceful_timeout
    );
    if let Err(e) = process.kill() {
        warn!("Failed to kill helper {}: {}", pid, e);
    }
}
