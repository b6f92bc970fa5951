//! Unix process management with safe spawn/kill using process groups
//!
//! The helper is spawned into its own session and process group via
//! `setsid()`, so signals aimed at it never reach the host's group and any
//! grandchildren it forks are cleaned up alongside it. SIGTERM is used for
//! graceful termination, SIGKILL for forceful termination; both target the
//! whole group through `killpg`.

// Process group setup requires libc::setsid() in pre_exec
#![allow(unsafe_code)]

use crate::{CoreError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
#[allow(unused_imports)]
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error};

/// A helper process running in its own Unix process group
///
/// The wrapped process is guaranteed to be a session leader, which makes the
/// PID double as the process group ID for signalling purposes.
#[derive(Debug)]
pub struct ChildProcess {
    /// The process ID of the spawned helper
    pid: Pid,
    /// The underlying Child handle for waiting and status checking
    child: Child,
}

impl ChildProcess {
    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Get the process group ID (same as PID for session leaders)
    pub fn pgid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Wait for the process to exit and return its exit status (async)
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        self.child.wait().await.map_err(|e| {
            CoreError::ProcessWait(format!("Failed to wait for process {}: {}", self.pid, e))
        })
    }

    /// Try to collect the exit status without blocking
    ///
    /// Returns `Ok(None)` while the process is still running. Once the
    /// process has been reaped the status is cached, so repeated calls keep
    /// returning `Ok(Some(status))`.
    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        self.child.try_wait().map_err(|e| {
            CoreError::ProcessWait(format!(
                "Failed to try_wait for process {}: {}",
                self.pid, e
            ))
        })
    }

    /// Take the stdout handle for async reading, if available
    pub fn take_stdout(&mut self) -> Option<tokio::process::ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the stderr handle for async reading, if available
    pub fn take_stderr(&mut self) -> Option<tokio::process::ChildStderr> {
        self.child.stderr.take()
    }
}

/// Spawn a new process in its own process group
///
/// stdout and stderr are piped so the caller can stream helper output into
/// the host's logs; stdin is closed.
///
/// ## Safety
///
/// `libc::setsid()` is called in the `pre_exec` closure. That is sound
/// because `setsid()` is async-signal-safe and runs in the child between
/// `fork` and `exec`.
///
/// ## Example
///
/// ```rust,no_run
/// use outrigger_core::process::unix::spawn;
///
/// let child = spawn("echo", &["hello"])?;
/// println!("helper pid: {}", child.pid());
/// # Ok::<(), outrigger_core::CoreError>(())
/// ```
pub fn spawn<S: AsRef<std::ffi::OsStr>>(cmd: &str, args: &[S]) -> Result<ChildProcess> {
    debug!(
        "Spawning helper: {} {:?}",
        cmd,
        args.iter().map(|a| a.as_ref()).collect::<Vec<_>>()
    );

    let mut command = Command::new(cmd);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    // Safety: setsid() is async-signal-safe and appropriate for pre_exec
    #[deny(unsafe_op_in_unsafe_fn)]
    unsafe {
        command.pre_exec(|| {
            // Create a new session and process group
            let result = libc::setsid();
            if result == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|e| {
        error!("Failed to spawn helper '{}': {}", cmd, e);
        CoreError::ProcessSpawn(format!("Failed to spawn '{}': {}", cmd, e))
    })?;

    // tokio::process::Child::id() returns None once the child has been reaped
    let raw_pid = child
        .id()
        .ok_or_else(|| CoreError::ProcessSpawn("Spawned child did not have a PID".to_string()))?;
    let pid = Pid::from_raw(raw_pid as i32);
    debug!("Spawned helper {} in new process group", pid);

    Ok(ChildProcess { pid, child })
}

/// Send SIGTERM to the process group for graceful termination
///
/// `ESRCH` (no such process) and `EPERM` are treated as success: both mean
/// the group is already gone or no longer ours to signal.
pub fn signal_term_group(child: &ChildProcess) -> Result<()> {
    debug!("Sending SIGTERM to process group {}", child.pid);

    match killpg(child.pid, Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => {
            debug!("Process group {} already exited", child.pid);
            Ok(())
        }
        Err(nix::errno::Errno::EPERM) => {
            debug!(
                "Permission denied signaling process group {} (likely already exited)",
                child.pid
            );
            Ok(())
        }
        Err(e) => {
            error!(
                "Failed to send SIGTERM to process group {}: {}",
                child.pid, e
            );
            Err(CoreError::ProcessSignal(format!(
                "Failed to send SIGTERM to process group {}: {}",
                child.pid, e
            )))
        }
    }
}

/// Send SIGKILL to the process group for forceful termination
///
/// Same `ESRCH`/`EPERM` handling as [`signal_term_group`].
pub fn signal_kill_group(child: &ChildProcess) -> Result<()> {
    debug!("Sending SIGKILL to process group {}", child.pid);

    match killpg(child.pid, Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => {
            debug!("Process group {} already exited", child.pid);
            Ok(())
        }
        Err(nix::errno::Errno::EPERM) => {
            debug!(
                "Permission denied signaling process group {} (likely already exited)",
                child.pid
            );
            Ok(())
        }
        Err(e) => {
            error!(
                "Failed to send SIGKILL to process group {}: {}",
                child.pid, e
            );
            Err(CoreError::ProcessSignal(format!(
                "Failed to send SIGKILL to process group {}: {}",
                child.pid, e
            )))
        }
    }
}
