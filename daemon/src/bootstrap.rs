//! Daemon bootstrap: load configuration and wire the supervisor
//!
//! `bootstrap` turns an optional config path into a running [`Supervisor`]
//! backed by the real OS spawner. The helper spec is held in a
//! [`SharedProvider`] so a host embedding this daemon can adjust the helper
//! (or its startup policy) at runtime without rebuilding anything.

use crate::{DaemonError, Result};
use outrigger_core::config::{load_helper_from_toml_path, HelperFile};
use outrigger_core::{OsSpawner, SharedProvider, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Handle to the running components
pub struct BootstrapHandle {
    /// Live view of the helper spec; update it to reconfigure at runtime
    pub provider: SharedProvider,
    /// The supervisor driving the helper
    pub supervisor: Arc<Supervisor>,
}

impl BootstrapHandle {
    /// Graceful shutdown: stop the poll loop and, per configuration, the helper
    pub async fn shutdown(self) {
        self.supervisor.shutdown().await;
        info!("Bootstrap shutdown complete");
    }
}

/// Bootstrap the daemon components
///
/// With no config path the daemon starts with defaults: an unconfigured
/// helper that the poll loop skips until a spec is provided through the
/// returned provider.
pub async fn bootstrap(config_path: Option<PathBuf>) -> Result<BootstrapHandle> {
    let cfg = if let Some(path) = config_path {
        let cfg = load_helper_from_toml_path(&path)
            .map_err(|e| DaemonError::ConfigError(e.to_string()))?;
        info!("Loaded configuration from {}", path.display());
        cfg
    } else {
        warn!("No config file given; starting with an unconfigured helper");
        HelperFile::default()
    };

    if cfg.helper.executable.is_empty() {
        warn!("No helper executable configured; the supervisor will idle");
    } else {
        info!(
            "Supervising helper '{}' (policy: {:?})",
            cfg.helper.executable, cfg.helper.startup_policy
        );
    }

    let provider = SharedProvider::new(cfg.helper);
    let supervisor = Arc::new(Supervisor::new(
        Arc::new(provider.clone()),
        Arc::new(OsSpawner::new()),
        cfg.supervisor,
    ));

    // Bring the poll loop up right away
    supervisor.tick();

    Ok(BootstrapHandle {
        provider,
        supervisor,
    })
}
