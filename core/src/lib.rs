//! Core functionality for the Outrigger helper supervisor
//!
//! This crate contains the supervisor itself plus the supporting pieces it
//! needs: error types, TOML configuration loading, configuration providers,
//! and the Unix process layer used to spawn and signal the helper.

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod process;
pub mod provider;
pub mod supervisor;

// Re-export schema types for convenience
pub use schema::*;

pub use error::{CoreError, Result};
pub use provider::{ConfigProvider, FixedProvider, SharedProvider};
#[cfg(unix)]
pub use supervisor::OsSpawner;
pub use supervisor::{SpawnedProcess, Spawner, StartOutcome, Supervisor};

/// Core utilities and helper functions
pub mod utils {
    use tracing::info;

    /// Initialize tracing for the application
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
