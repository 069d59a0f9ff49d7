//! Command-line interface for pinwatch.
//!
//! Provides argument parsing and the command implementations.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
