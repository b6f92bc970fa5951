//! Configuration loading and validation for the Outrigger supervisor
//!
//! This module parses a TOML configuration into `schema::HelperSpec` and
//! `schema::SupervisorSettings` values, applies sane defaults (via serde
//! defaults on schema types), and performs validation with field-path error
//! messages.
//!
//! An empty `helper.executable` is accepted here: the path is a runtime
//! concern that the start guard validates on every attempt, so a host may
//! load a configuration before the helper has been chosen.

use crate::{CoreError, Result};
use schema::{HelperSpec, SupervisorSettings};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level TOML structure for the supervisor configuration
///
/// ```toml
/// [helper]
/// executable = "/usr/local/bin/companion"
/// args = ["--quiet"]
/// startupPolicy = "automatic"
///
/// [supervisor]
/// pollIntervalMs = 10
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelperFile {
    /// The helper process to supervise
    #[serde(default)]
    pub helper: HelperSpec,

    /// Supervisor loop tunables
    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

impl HelperFile {
    /// Validate the configuration and return `Result<()>` with field-path errors
    pub fn validate(&self) -> Result<()> {
        let s = &self.supervisor;

        if s.poll_interval_ms == 0 {
            return Err(CoreError::ValidationError(
                "supervisor.pollIntervalMs: must be > 0".to_string(),
            ));
        }
        if s.respawn_base_delay_ms == 0 {
            return Err(CoreError::ValidationError(
                "supervisor.respawnBaseDelayMs: must be > 0".to_string(),
            ));
        }
        if s.respawn_max_delay_ms < s.respawn_base_delay_ms {
            return Err(CoreError::ValidationError(
                "supervisor.respawnMaxDelayMs: must be >= respawnBaseDelayMs".to_string(),
            ));
        }
        if s.respawn_multiplier < 1.0 {
            return Err(CoreError::ValidationError(
                "supervisor.respawnMultiplier: must be >= 1.0".to_string(),
            ));
        }
        if s.max_respawn_attempts == 0 {
            return Err(CoreError::ValidationError(
                "supervisor.maxRespawnAttempts: must be > 0".to_string(),
            ));
        }
        if s.graceful_timeout_secs == 0 {
            return Err(CoreError::ValidationError(
                "supervisor.gracefulTimeoutSecs: must be > 0".to_string(),
            ));
        }

        for (i, arg) in self.helper.args.iter().enumerate() {
            if arg.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "helper.args[{}]: cannot be empty",
                    i
                )));
            }
        }

        Ok(())
    }
}

impl Default for HelperFile {
    fn default() -> Self {
        Self {
            helper: HelperSpec::default(),
            supervisor: SupervisorSettings::default(),
        }
    }
}

/// Load the supervisor configuration from a TOML file path
pub fn load_helper_from_toml_path(path: impl AsRef<Path>) -> Result<HelperFile> {
    let data = fs::read_to_string(&path).map_err(|e| {
        CoreError::ConfigurationError(format!("Failed to read config {:?}: {}", path.as_ref(), e))
    })?;
    load_helper_from_toml_str(&data)
}

/// Load the supervisor configuration from a TOML string
pub fn load_helper_from_toml_str(input: &str) -> Result<HelperFile> {
    let cfg: HelperFile = toml::from_str(input)
        .map_err(|e| CoreError::ConfigurationError(format!("TOML parse error: {}", e)))?;
    cfg.validate()?;
    Ok(cfg)
}
