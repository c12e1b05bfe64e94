//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Flatten command arguments.
#[derive(Debug, Args)]
pub struct FlattenCommand {
    /// JSON file holding one record or an array of records
    pub file: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Only list the keys each record provides, and warn about template
    /// tags they leave unresolved
    #[arg(short, long, conflicts_with = "json")]
    pub keys: bool,

    /// Template to check keys against (defaults to the configured template)
    #[arg(short, long, value_name = "FILE", requires = "keys")]
    pub template: Option<PathBuf>,
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// JSON file holding one record or an array of records
    pub file: PathBuf,

    /// Template to render with (defaults to the configured template)
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Directory to write documents to (defaults to the configured directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Shell command arguments.
#[derive(Debug, Args)]
pub struct ShellCommand {
    /// Log in as this user on startup
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, requires = "user")]
    pub password: Option<String>,

    /// Preload records from a JSON file
    #[arg(long, value_name = "FILE")]
    pub load: Option<PathBuf>,

    /// Directory exported documents are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_command_debug() {
        let cmd = FlattenCommand {
            file: PathBuf::from("record.json"),
            json: true,
            keys: false,
            template: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("record.json"));
        assert!(debug_str.contains("json"));
    }

    #[test]
    fn test_render_command_debug() {
        let cmd = RenderCommand {
            file: PathBuf::from("record.json"),
            template: Some(PathBuf::from("t.txt")),
            output: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("t.txt"));
    }

    #[test]
    fn test_shell_command_debug() {
        let cmd = ShellCommand {
            user: Some("admin".to_string()),
            password: None,
            load: None,
            output: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("admin"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
