//! CLI: authorization, sync, cached display, background watch
//!
//! This crate provides the `fitsync` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod session;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use session::Session;
