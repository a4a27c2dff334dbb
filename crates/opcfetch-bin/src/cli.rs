// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: trigger the processor on a schedule (default)
//! - `validate`: check a configuration file
//! - `version`: show version information

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// opcfetch - walk an OPC UA node tree and emit every variable as a record
#[derive(Parser, Debug)]
#[command(
    name = "opcfetch",
    author = "Sylvex <contact@sylvex.io>",
    version = opcfetch_core::VERSION,
    about = "Fetch OPC UA variable nodes below a root node",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "opcfetch.yaml",
        env = "OPCFETCH_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, env = "OPCFETCH_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, env = "OPCFETCH_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Trigger the processor on a fixed interval
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without connecting.
    Validate(ValidateArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Run a single trigger and exit
    #[arg(long)]
    pub once: bool,

    /// Trigger interval, e.g. `5s`; overrides the config file
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for log aggregation
    Json,
    /// Compact single-line text
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parses CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, defaulting to `run`.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Log level from the flags, falling back to `configured` and then
    /// `info`.
    pub fn effective_log_level<'a>(&'a self, configured: Option<&'a str>) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().or(configured).unwrap_or("info")
        }
    }

    /// Log format from the flags, falling back to `configured`.
    pub fn effective_log_format(&self, configured: Option<LogFormat>) -> LogFormat {
        self.log_format.or(configured).unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["opcfetch"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(args) if !args.once));
    }

    #[test]
    fn test_run_once_with_interval() {
        let cli = Cli::parse_from(["opcfetch", "run", "--once", "-i", "250ms"]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.once);
                assert_eq!(args.interval, Some(Duration::from_millis(250)));
            }
            other => panic!("Expected Run command, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["opcfetch", "validate", "--show-config", "-f", "json"]);
        match cli.command {
            Some(Commands::Validate(args)) => {
                assert!(args.show_config);
                assert_eq!(args.format, OutputFormat::Json);
            }
            other => panic!("Expected Validate command, got {other:?}"),
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["opcfetch", "-c", "/etc/opcfetch/plant.toml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/opcfetch/plant.toml"));
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::parse_from(["opcfetch"]);
        assert_eq!(cli.effective_log_level(None), "info");
        assert_eq!(cli.effective_log_level(Some("trace")), "trace");

        let cli = Cli::parse_from(["opcfetch", "-l", "error"]);
        assert_eq!(cli.effective_log_level(Some("trace")), "error");

        let cli = Cli::parse_from(["opcfetch", "-q", "-l", "error"]);
        assert_eq!(cli.effective_log_level(None), "warn");

        let cli = Cli::parse_from(["opcfetch", "-v"]);
        assert_eq!(cli.effective_log_level(None), "debug");
    }

    #[test]
    fn test_log_format_precedence() {
        let cli = Cli::parse_from(["opcfetch"]);
        assert_eq!(cli.effective_log_format(None), LogFormat::Text);
        assert_eq!(cli.effective_log_format(Some(LogFormat::Json)), LogFormat::Json);

        let cli = Cli::parse_from(["opcfetch", "--log-format", "compact"]);
        assert_eq!(cli.effective_log_format(Some(LogFormat::Json)), LogFormat::Compact);
    }
}
