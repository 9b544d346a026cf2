//! CLI module for flow - command-line interface, rendering and prompts.
//!
//! Provides the `candidates`, `highlight` and `refine` subcommands, colored terminal
//! output, and the interactive edit prompt.

pub mod commands;
pub mod prompt;
pub mod render;

pub use commands::Cli;
