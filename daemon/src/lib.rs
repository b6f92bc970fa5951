//! Daemon library for the Outrigger supervisor
//!
//! A thin host around `outrigger_core`: it loads the TOML configuration,
//! wires a [`Supervisor`](outrigger_core::Supervisor) to the real OS spawner,
//! and drives the supervisor's tick from a heartbeat until shutdown.

#![allow(unused_crate_dependencies)]

pub mod bootstrap;
pub mod simple_error;

#[cfg(test)]
mod simple_error_tests;

pub use bootstrap::{bootstrap, BootstrapHandle};
pub use simple_error::{DaemonError, Result};
