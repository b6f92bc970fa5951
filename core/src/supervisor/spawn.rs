//! Spawner abstraction for launching the helper process
//!
//! The supervisor never talks to the OS directly. It goes through the
//! [`Spawner`] trait, which lets tests substitute a [`MockSpawner`] scripted
//! with per-spawn instructions while production uses [`OsSpawner`] on top of
//! the Unix process-group layer.

use crate::Result;
use async_trait::async_trait;
use schema::HelperSpec;
use std::sync::Arc;
use tracing::debug;

/// Launches helper processes according to the current spec
#[async_trait]
pub trait Spawner: Send + Sync {
    /// Spawn the helper described by `spec`
    ///
    /// `parent_arg` is appended after the configured arguments so the child
    /// can identify the host process it belongs to.
    async fn spawn(&self, spec: &HelperSpec, parent_arg: &str) -> Result<Box<dyn SpawnedProcess>>;
}

/// A live (or recently exited) helper process
///
/// Liveness checks are non-blocking. `terminate` asks nicely (SIGTERM to the
/// group), `kill` does not (SIGKILL).
pub trait SpawnedProcess: Send {
    /// Process ID of the helper
    fn pid(&self) -> u32;

    /// Whether the process is still running, per the last-known exit status
    fn is_alive(&mut self) -> bool;

    /// Request graceful termination
    fn terminate(&mut self) -> Result<()>;

    /// Force termination
    fn kill(&mut self) -> Result<()>;
}

/// Spawner backed by real OS processes
#[cfg(unix)]
#[derive(Copy, Clone, Debug, Default)]
pub struct OsSpawner;

#[cfg(unix)]
impl OsSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
#[async_trait]
impl Spawner for OsSpawner {
    async fn spawn(&self, spec: &HelperSpec, parent_arg: &str) -> Result<Box<dyn SpawnedProcess>> {
        use crate::process::unix;

        let mut args = spec.args.clone();
        args.push(parent_arg.to_string());

        let mut child = unix::spawn(&spec.executable, &args)?;
        stream_helper_output(&mut child);

        Ok(Box::new(OsProcess { child }))
    }
}

/// Forward helper stdout/stderr lines into the host's logs
#[cfg(unix)]
fn stream_helper_output(child: &mut crate::process::unix::ChildProcess) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let pid = child.pid();
    if let Some(stdout) = child.take_stdout() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("helper[{}] stdout: {}", pid, line);
            }
        });
    }
    if let Some(stderr) = child.take_stderr() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("helper[{}] stderr: {}", pid, line);
            }
        });
    }
}

#[cfg(unix)]
struct OsProcess {
    child: crate::process::unix::ChildProcess,
}

#[cfg(unix)]
impl SpawnedProcess for OsProcess {
    fn pid(&self) -> u32 {
        self.child.pid()
    }

    fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(e) => {
                tracing::warn!("try_wait failed for helper {}: {}", self.child.pid(), e);
                false
            }
        }
    }

    fn terminate(&mut self) -> Result<()> {
        crate::process::unix::signal_term_group(&self.child)
    }

    fn kill(&mut self) -> Result<()> {
        crate::process::unix::signal_kill_group(&self.child)
    }
}

/// Scripted behavior for one mock spawn
#[derive(Debug, Clone)]
pub struct MockInstruction {
    /// Time spent inside `spawn` before it returns; the start guard holds
    /// its lock for the duration
    pub spawn_delay: std::time::Duration,
    /// When set, the spawn fails with this message instead of producing a
    /// process
    pub spawn_error: Option<String>,
    /// How long the fake process runs before exiting on its own;
    /// `None` means it runs until signalled
    pub run_for: Option<std::time::Duration>,
    /// Whether SIGTERM is honored; SIGKILL always is
    pub responds_to_signals: bool,
}

impl Default for MockInstruction {
    fn default() -> Self {
        Self {
            spawn_delay: std::time::Duration::ZERO,
            spawn_error: None,
            run_for: None,
            responds_to_signals: true,
        }
    }
}

impl MockInstruction {
    /// A helper that keeps running until signalled
    pub fn long_running() -> Self {
        Self::default()
    }

    /// A helper that exits on its own after `run_for`
    pub fn exits_after(run_for: std::time::Duration) -> Self {
        Self {
            run_for: Some(run_for),
            ..Self::default()
        }
    }

    /// A spawn that fails outright
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            spawn_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// A spawn that succeeds but takes `delay` to return
    pub fn slow_spawn(delay: std::time::Duration) -> Self {
        Self {
            spawn_delay: delay,
            ..Self::default()
        }
    }
}

/// One recorded spawn attempt, including the arguments actually passed
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub executable: String,
    pub args: Vec<String>,
}

/// Mock spawner for testing
///
/// Spawns consume scripted [`MockInstruction`]s in FIFO order; when the
/// queue is empty the fallback instruction applies, so a mock can model
/// "every spawn fails" without scripting each attempt.
#[derive(Debug, Clone, Default)]
pub struct MockSpawner {
    state: Arc<MockState>,
}

#[derive(Debug)]
struct MockState {
    instructions: std::sync::Mutex<Vec<MockInstruction>>,
    fallback: std::sync::Mutex<MockInstruction>,
    spawns: std::sync::Mutex<Vec<SpawnRecord>>,
    terminated: std::sync::Mutex<Vec<u32>>,
    killed: std::sync::Mutex<Vec<u32>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            instructions: std::sync::Mutex::new(vec![]),
            fallback: std::sync::Mutex::new(MockInstruction::default()),
            spawns: std::sync::Mutex::new(vec![]),
            terminated: std::sync::Mutex::new(vec![]),
            killed: std::sync::Mutex::new(vec![]),
        }
    }
}

impl MockSpawner {
    /// Mock whose spawns produce long-running helpers
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose every spawn fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        let spawner = Self::new();
        spawner.set_fallback(MockInstruction::spawn_failure(message));
        spawner
    }

    /// Queue an instruction for the next spawn
    pub fn push_instruction(&self, instruction: MockInstruction) {
        self.state
            .instructions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(instruction);
    }

    /// Replace the instruction applied once the queue is empty
    pub fn set_fallback(&self, instruction: MockInstruction) {
        *self
            .state
            .fallback
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = instruction;
    }

    /// Number of spawn attempts so far, failed ones included
    pub fn spawn_count(&self) -> usize {
        self.state
            .spawns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// All spawn attempts recorded so far
    pub fn spawn_records(&self) -> Vec<SpawnRecord> {
        self.state
            .spawns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// PIDs that received a terminate request
    pub fn terminated_pids(&self) -> Vec<u32> {
        self.state
            .terminated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// PIDs that received a kill request
    pub fn killed_pids(&self) -> Vec<u32> {
        self.state
            .killed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_instruction(&self) -> MockInstruction {
        let mut queue = self
            .state
            .instructions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if queue.is_empty() {
            self.state
                .fallback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        } else {
            queue.remove(0)
        }
    }
}

#[async_trait]
impl Spawner for MockSpawner {
    async fn spawn(&self, spec: &HelperSpec, parent_arg: &str) -> Result<Box<dyn SpawnedProcess>> {
        let instruction = self.next_instruction();

        {
            let mut args = spec.args.clone();
            args.push(parent_arg.to_string());
            self.state
                .spawns
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(SpawnRecord {
                    executable: spec.executable.clone(),
                    args,
                });
        }

        if !instruction.spawn_delay.is_zero() {
            tokio::time::sleep(instruction.spawn_delay).await;
        }

        if let Some(message) = instruction.spawn_error {
            return Err(crate::CoreError::ProcessSpawn(message));
        }

        let pid = rand::random::<u32>() % 65536 + 1000;
        debug!("Spawned mock helper {} for '{}'", pid, spec.executable);

        Ok(Box::new(MockProcess {
            pid,
            run_for: instruction.run_for,
            responds_to_signals: instruction.responds_to_signals,
            started_at: tokio::time::Instant::now(),
            signalled: false,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockProcess {
    pid: u32,
    run_for: Option<std::time::Duration>,
    responds_to_signals: bool,
    started_at: tokio::time::Instant,
    signalled: bool,
    state: Arc<MockState>,
}

impl SpawnedProcess for MockProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        if self.signalled {
            return false;
        }
        match self.run_for {
            Some(run_for) => self.started_at.elapsed() < run_for,
            None => true,
        }
    }

    fn terminate(&mut self) -> Result<()> {
        debug!("Terminating mock helper {}", self.pid);
        self.state
            .terminated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.pid);
        if self.responds_to_signals {
            self.signalled = true;
        }
        Ok(())
    }

    fn kill(&mut self) -> Result<()> {
        debug!("Killing mock helper {}", self.pid);
        self.state
            .killed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.pid);
        // SIGKILL cannot be ignored
        self.signalled = true;
        Ok(())
    }
}

// Simple random number generator for mock PIDs
mod rand {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED: AtomicU32 = AtomicU32::new(1);

    pub(crate) fn random<T>() -> T
    where
        T: From<u32>,
    {
        // Linear congruential generator, glibc constants
        let prev = SEED.load(Ordering::Relaxed);
        let next = prev.wrapping_mul(1103515245).wrapping_add(12345);
        SEED.store(next, Ordering::Relaxed);
        T::from(next)
    }
}
