//! Command-line interface for repairlog.
//!
//! This module provides the CLI structure for the `replog` binary and the
//! interactive session shell.

mod commands;
pub mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FlattenCommand, RenderCommand, ShellCommand};
pub use shell::{Flow, Shell};

/// replog - Record equipment repairs and export them as documents
///
/// Flatten and render record files directly, or open an interactive shell
/// that keeps records in memory for the length of the session.
#[derive(Debug, Parser)]
#[command(name = "replog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the flattened template context of a record file
    Flatten(FlattenCommand),

    /// Render a record file to documents
    Render(RenderCommand),

    /// Start an interactive repair desk session
    Shell(ShellCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
