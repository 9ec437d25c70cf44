// ABOUTME: Library root for relevo - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cmd;
pub mod config;
pub mod deploy;
pub mod error;
pub mod health;
pub mod hooks;
pub mod stage;
pub mod store;
pub mod supervisor;
pub mod types;
