//! Last-known state of the supervised helper
//!
//! At most one live process reference exists at a time. The slot holds the
//! current (possibly already exited) process together with the most recent
//! start error, and every observation is published on a `watch` channel so
//! hosts can subscribe to status changes instead of polling.
//!
//! The slot lock is a plain `std` mutex and is never held across an await.

use super::spawn::SpawnedProcess;
use schema::HelperStatus;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

pub(crate) struct HelperHandle {
    slot: Mutex<Slot>,
    status_tx: watch::Sender<HelperStatus>,
}

#[derive(Default)]
struct Slot {
    process: Option<Box<dyn SpawnedProcess>>,
    last_error: Option<String>,
}

impl HelperHandle {
    pub(crate) fn new() -> Self {
        let (status_tx, _) = watch::channel(HelperStatus::default());
        Self {
            slot: Mutex::new(Slot::default()),
            status_tx,
        }
    }

    /// Whether the helper is running, per the last-known exit status
    ///
    /// Non-blocking. A handle that was never installed, or whose process has
    /// exited, reports `false`.
    pub(crate) fn is_running(&self) -> bool {
        let mut slot = self.lock_slot();
        let running = match slot.process.as_mut() {
            Some(process) => process.is_alive(),
            None => false,
        };
        self.publish(&slot, running);
        running
    }

    /// PID of the current process reference, if any
    pub(crate) fn pid(&self) -> Option<u32> {
        self.lock_slot().process.as_ref().map(|p| p.pid())
    }

    /// Most recent start error, cleared at the beginning of each attempt
    pub(crate) fn last_error(&self) -> Option<String> {
        self.lock_slot().last_error.clone()
    }

    /// Fresh status snapshot
    pub(crate) fn status(&self) -> HelperStatus {
        let _ = self.is_running();
        self.status_tx.borrow().clone()
    }

    /// Subscribe to status changes
    pub(crate) fn subscribe(&self) -> watch::Receiver<HelperStatus> {
        self.status_tx.subscribe()
    }

    /// Drop any stale process reference and forget the previous start error
    ///
    /// Called by the start guard at the beginning of an attempt, after it has
    /// confirmed under the lock that the helper is not running.
    pub(crate) fn clear_stale(&self) {
        let mut slot = self.lock_slot();
        slot.process = None;
        slot.last_error = None;
        self.publish(&slot, false);
    }

    /// Install a freshly spawned process
    ///
    /// Returns `false` when the process is already dead on arrival, in which
    /// case the slot stays empty and the failure is recorded.
    pub(crate) fn install(&self, mut process: Box<dyn SpawnedProcess>) -> bool {
        let running = process.is_alive();
        let mut slot = self.lock_slot();
        if running {
            slot.process = Some(process);
        } else {
            slot.last_error = Some(format!(
                "helper {} exited immediately after spawn",
                process.pid()
            ));
        }
        self.publish(&slot, running);
        running
    }

    /// Record a start failure without touching the process reference
    pub(crate) fn record_error(&self, message: impl Into<String>) {
        let mut slot = self.lock_slot();
        slot.last_error = Some(message.into());
        let running = match slot.process.as_mut() {
            Some(process) => process.is_alive(),
            None => false,
        };
        self.publish(&slot, running);
    }

    /// Remove and return the current process reference
    ///
    /// Used at shutdown when the supervisor owns termination.
    pub(crate) fn take_process(&self) -> Option<Box<dyn SpawnedProcess>> {
        let mut slot = self.lock_slot();
        let process = slot.process.take();
        self.publish(&slot, false);
        process
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, slot: &Slot, running: bool) {
        let status = HelperStatus {
            running,
            pid: slot.process.as_ref().map(|p| p.pid()),
            last_error: slot.last_error.clone(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
