//! Process management for the Outrigger helper
//!
//! Platform-specific spawning and lifecycle primitives. Unix is the only
//! supported platform today: the helper is detached into its own process
//! group so that signalling it never touches the host's group.

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::*;
