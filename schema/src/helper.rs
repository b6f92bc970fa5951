//! Helper process specification and supervisor settings
//!
//! This module contains the core data structures for describing the single
//! external helper process managed by the supervisor: what to launch, when
//! launching is allowed, and how the monitoring loop behaves.
//!
//! ## Startup Policies
//!
//! The supervisor supports three startup policies:
//! - `Automatic`: the monitoring loop starts the helper whenever it is not running
//! - `Delayed`: the helper is started only on an explicit request, never by the loop
//! - `Never`: no start is ever attempted, explicit or automatic

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Startup policy determining when the helper process may be started
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StartupPolicy {
    /// Start the helper whenever it is found not running
    Automatic,
    /// Start only on an explicit request, never from the monitoring loop
    Delayed,
    /// Never start the helper, explicitly or automatically
    Never,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        StartupPolicy::Automatic
    }
}

impl StartupPolicy {
    /// Check if the monitoring loop may start the helper on its own
    pub fn allows_automatic_start(&self) -> bool {
        matches!(self, StartupPolicy::Automatic)
    }

    /// Check if an explicit start request may proceed
    pub fn allows_explicit_start(&self) -> bool {
        !matches!(self, StartupPolicy::Never)
    }
}

/// Specification for the helper process to supervise
///
/// This is the value a configuration provider hands to the supervisor on
/// every poll. It may change between polls; the supervisor acts on the
/// freshest snapshot without requiring a restart.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelperSpec {
    /// Path to the helper executable; may be empty while unconfigured
    #[serde(default)]
    pub executable: String,

    /// Extra command-line arguments passed before the parent-pid argument
    #[serde(default)]
    pub args: Vec<String>,

    /// When the helper may be started
    #[serde(default)]
    pub startup_policy: StartupPolicy,
}

impl Default for HelperSpec {
    fn default() -> Self {
        Self {
            executable: String::new(),
            args: Vec::new(),
            startup_policy: StartupPolicy::default(),
        }
    }
}

/// Tunables for the supervisor loop and its self-healing behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorSettings {
    /// Interval in milliseconds between liveness polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Base delay in milliseconds before respawning a dead loop task
    #[serde(default = "default_respawn_base_delay_ms")]
    pub respawn_base_delay_ms: u64,

    /// Maximum respawn delay in milliseconds (caps exponential growth)
    #[serde(default = "default_respawn_max_delay_ms")]
    pub respawn_max_delay_ms: u64,

    /// Multiplicative factor for exponential respawn backoff
    #[serde(default = "default_respawn_multiplier")]
    pub respawn_multiplier: f64,

    /// Consecutive loop deaths tolerated before the supervisor gives up
    #[serde(default = "default_max_respawn_attempts")]
    pub max_respawn_attempts: u32,

    /// Maximum time in seconds to wait for graceful helper shutdown before SIGKILL
    #[serde(default = "default_graceful_timeout_secs")]
    pub graceful_timeout_secs: u64,

    /// Whether to terminate the helper's process group on supervisor shutdown.
    /// When false the helper is left detached and self-supervises via the
    /// parent-pid argument it received at spawn.
    #[serde(default)]
    pub terminate_on_shutdown: bool,
}

impl SupervisorSettings {
    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the base respawn delay as a Duration
    pub fn respawn_base_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_base_delay_ms)
    }

    /// Get the maximum respawn delay as a Duration
    pub fn respawn_max_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_max_delay_ms)
    }

    /// Get the graceful shutdown timeout as a Duration
    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_timeout_secs)
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            respawn_base_delay_ms: default_respawn_base_delay_ms(),
            respawn_max_delay_ms: default_respawn_max_delay_ms(),
            respawn_multiplier: default_respawn_multiplier(),
            max_respawn_attempts: default_max_respawn_attempts(),
            graceful_timeout_secs: default_graceful_timeout_secs(),
            terminate_on_shutdown: false,
        }
    }
}

const fn default_poll_interval_ms() -> u64 {
    10
}

const fn default_respawn_base_delay_ms() -> u64 {
    100
}

const fn default_respawn_max_delay_ms() -> u64 {
    30_000
}

const fn default_respawn_multiplier() -> f64 {
    2.0
}

const fn default_max_respawn_attempts() -> u32 {
    8
}

const fn default_graceful_timeout_secs() -> u64 {
    5
}

/// Snapshot of the helper's observed state, published on every change
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelperStatus {
    /// Whether the helper process is currently running
    pub running: bool,

    /// Process ID of the running helper, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Message from the most recent failed start attempt, cleared on each new attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for HelperStatus {
    fn default() -> Self {
        Self {
            running: false,
            pid: None,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_policy_default() {
        assert_eq!(StartupPolicy::default(), StartupPolicy::Automatic);
    }

    #[test]
    fn test_startup_policy_predicates() {
        assert!(StartupPolicy::Automatic.allows_automatic_start());
        assert!(StartupPolicy::Automatic.allows_explicit_start());

        assert!(!StartupPolicy::Delayed.allows_automatic_start());
        assert!(StartupPolicy::Delayed.allows_explicit_start());

        assert!(!StartupPolicy::Never.allows_automatic_start());
        assert!(!StartupPolicy::Never.allows_explicit_start());
    }

    #[test]
    fn test_startup_policy_serializes_camel_case() {
        let json = serde_json::to_string(&StartupPolicy::Automatic).unwrap();
        assert_eq!(json, "\"automatic\"");
        let json = serde_json::to_string(&StartupPolicy::Delayed).unwrap();
        assert_eq!(json, "\"delayed\"");
        let json = serde_json::to_string(&StartupPolicy::Never).unwrap();
        assert_eq!(json, "\"never\"");

        let policy: StartupPolicy = serde_json::from_str("\"delayed\"").unwrap();
        assert_eq!(policy, StartupPolicy::Delayed);
    }

    #[test]
    fn test_helper_spec_defaults() {
        let spec = HelperSpec::default();
        assert!(spec.executable.is_empty());
        assert!(spec.args.is_empty());
        assert_eq!(spec.startup_policy, StartupPolicy::Automatic);
    }

    #[test]
    fn test_helper_spec_deserializes_with_defaults() {
        let spec: HelperSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, HelperSpec::default());

        let spec: HelperSpec =
            serde_json::from_str(r#"{"executable": "/usr/bin/helper", "startupPolicy": "never"}"#)
                .unwrap();
        assert_eq!(spec.executable, "/usr/bin/helper");
        assert_eq!(spec.startup_policy, StartupPolicy::Never);
    }

    #[test]
    fn test_supervisor_settings_defaults() {
        let settings = SupervisorSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(10));
        assert_eq!(settings.respawn_base_delay(), Duration::from_millis(100));
        assert_eq!(settings.respawn_max_delay(), Duration::from_secs(30));
        assert_eq!(settings.respawn_multiplier, 2.0);
        assert_eq!(settings.max_respawn_attempts, 8);
        assert_eq!(settings.graceful_timeout(), Duration::from_secs(5));
        assert!(!settings.terminate_on_shutdown);
    }

    #[test]
    fn test_supervisor_settings_partial_deserialize() {
        let settings: SupervisorSettings =
            serde_json::from_str(r#"{"pollIntervalMs": 50, "terminateOnShutdown": true}"#).unwrap();
        assert_eq!(settings.poll_interval(), Duration::from_millis(50));
        assert!(settings.terminate_on_shutdown);
        // Untouched fields keep their defaults
        assert_eq!(settings.max_respawn_attempts, 8);
    }

    #[test]
    fn test_helper_status_default_and_roundtrip() {
        let status = HelperStatus::default();
        assert!(!status.running);
        assert_eq!(status.pid, None);
        assert_eq!(status.last_error, None);

        let running = HelperStatus {
            running: true,
            pid: Some(4242),
            last_error: None,
        };
        let json = serde_json::to_string(&running).unwrap();
        assert!(json.contains("\"running\":true"));
        assert!(json.contains("\"pid\":4242"));
        // Absent optionals are omitted entirely
        assert!(!json.contains("lastError"));

        let back: HelperStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, running);
    }

    #[test]
    fn test_json_schema_generation() {
        let schema = schemars::schema_for!(HelperSpec);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("startupPolicy"));
        assert!(json.contains("executable"));
    }
}
