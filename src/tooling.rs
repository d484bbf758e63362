//! Tooling & Integration Layer
//!
//! Command-line front end over the catalog.

pub mod cli;

pub use cli::{CacheCommands, Cli, CliContext, Commands, OutputFormat};
