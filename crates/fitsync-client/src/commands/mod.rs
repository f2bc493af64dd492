//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod show;
pub mod sync;
pub mod watch;
