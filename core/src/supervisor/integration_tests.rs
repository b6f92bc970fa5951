//! Integration test modules for the supervisor system

#[path = "guard_tests.rs"]
mod guard_tests;

#[path = "poll_loop_tests.rs"]
mod poll_loop_tests;

#[path = "respawn_tests.rs"]
mod respawn_tests;
