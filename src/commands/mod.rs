//! CLI command implementations for herakles-process-info.
//!
//! This module provides implementations for all CLI subcommands:
//! - `query`: One-shot PID lookup against procfs
//! - `check`: System validation
//! - `config`: Configuration file generation

pub mod check;
pub mod config;
pub mod query;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use query::command_query;
