//! CLI module for the valosync tool.
//!
//! This module provides the command-line interface for synchronizing
//! declared resources against the Valohai API.

mod commands;
mod output;

pub use commands::{Cli, Commands, KindArg, OutputFormat, StateCommands};
pub use output::OutputFormatter;
