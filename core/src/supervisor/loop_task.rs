//! Background poll loop keeping the helper alive
//!
//! One cycle: snapshot the spec, and if the policy is `Automatic` while the
//! helper is not running, funnel a start attempt through the guard. The
//! interval is fixed; there is no backoff between failed automatic attempts,
//! so a persistently broken spawn is retried every cycle and logged each
//! time.

use super::guard;
use super::SupervisorInner;
use schema::SupervisorSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

/// Run liveness polls until the cancellation token fires
pub(crate) async fn run_poll_loop(inner: Arc<SupervisorInner>) {
    let poll_interval = inner.settings.poll_interval();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Helper poll loop started (interval {:?})", poll_interval);

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => {
                info!("Helper poll loop stopping");
                return;
            }
            _ = ticker.tick() => {
                poll_once(&inner).await;
            }
        }
    }
}

/// One poll cycle; a failed cycle never takes the loop down
async fn poll_once(inner: &SupervisorInner) {
    let spec = inner.provider.snapshot();
    if !spec.startup_policy.allows_automatic_start() {
        return;
    }
    if inner.handle.is_running() {
        return;
    }

    // The guard logs the interesting outcomes itself
    let outcome = guard::try_start(inner).await;
    trace!("Automatic start attempt finished: {:?}", outcome);
}

/// Exponential backoff schedule for respawning a dead poll loop task
#[derive(Debug, Clone, Copy)]
pub(crate) struct RespawnBackoff {
    base: Duration,
    multiplier: f64,
    max: Duration,
}

impl RespawnBackoff {
    pub(crate) fn from_settings(settings: &SupervisorSettings) -> Self {
        Self {
            base: settings.respawn_base_delay(),
            multiplier: settings.respawn_multiplier,
            max: settings.respawn_max_delay(),
        }
    }

    /// Delay before respawn attempt `attempt` (1-based): base for the first,
    /// multiplied per further attempt, clamped to the maximum
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = self.multiplier.powi(exponent as i32);
        let delay_ms = (self.base.as_millis() as f64) * factor;
        let max_ms = self.max.as_millis() as f64;
        Duration::from_millis(delay_ms.min(max_ms) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_ms: u64, multiplier: f64, max_ms: u64) -> RespawnBackoff {
        RespawnBackoff {
            base: Duration::from_millis(base_ms),
            multiplier,
            max: Duration::from_millis(max_ms),
        }
    }

    #[test]
    fn first_attempt_uses_base_delay() {
        let b = backoff(100, 2.0, 30_000);
        assert_eq!(b.delay_for(1), Duration::from_millis(100));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let b = backoff(100, 2.0, 30_000);
        assert_eq!(b.delay_for(2), Duration::from_millis(200));
        assert_eq!(b.delay_for(3), Duration::from_millis(400));
        assert_eq!(b.delay_for(5), Duration::from_millis(1_600));
    }

    #[test]
    fn delay_is_clamped_to_max() {
        let b = backoff(100, 2.0, 30_000);
        assert_eq!(b.delay_for(9), Duration::from_millis(25_600));
        assert_eq!(b.delay_for(10), Duration::from_millis(30_000));
        assert_eq!(b.delay_for(60), Duration::from_millis(30_000));
    }

    #[test]
    fn multiplier_of_one_keeps_delay_constant() {
        let b = backoff(250, 1.0, 30_000);
        assert_eq!(b.delay_for(1), Duration::from_millis(250));
        assert_eq!(b.delay_for(7), Duration::from_millis(250));
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let b = backoff(100, 2.0, 30_000);
        assert_eq!(b.delay_for(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn from_settings_uses_the_configured_values() {
        let settings = SupervisorSettings {
            respawn_base_delay_ms: 50,
            respawn_multiplier: 3.0,
            respawn_max_delay_ms: 1_000,
            ..SupervisorSettings::default()
        };
        let b = RespawnBackoff::from_settings(&settings);
        assert_eq!(b.delay_for(1), Duration::from_millis(50));
        assert_eq!(b.delay_for(2), Duration::from_millis(150));
        assert_eq!(b.delay_for(4), Duration::from_millis(1_000));
    }
}
