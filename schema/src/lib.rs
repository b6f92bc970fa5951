//! Shared data types for the Outrigger helper supervisor
//!
//! This crate contains the serializable types exchanged between the
//! supervisor core and its hosts: the helper specification read from the
//! configuration provider, the supervisor tunables, and the status snapshot
//! published while the helper runs. All types serialize as camelCase JSON
//! and implement JSON Schema generation for external consumption.

pub mod helper;

pub use helper::{HelperSpec, HelperStatus, StartupPolicy, SupervisorSettings};
