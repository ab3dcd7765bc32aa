// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command line of the `panelbridge` binary.
//!
//! `run` is implied when no subcommand is given. `validate`, `version` and
//! `ports` never open the panel link.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// panelbridge - serial bridge to a line-oriented security panel
#[derive(Parser, Debug)]
#[command(
    name = "panelbridge",
    author = "Sylvex <contact@sylvex.io>",
    version = panelbridge_core::VERSION,
    about = "Serial bridge to a line-oriented security panel controller",
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, env = "PANELBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "PANELBRIDGE_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Same as `--log-level warn`
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Same as `--log-level debug`
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Open the panel link and keep it up until interrupted
    Run(RunArgs),

    /// Check a configuration file without opening the port
    Validate(ValidateArgs),

    /// Print version and build details
    Version,

    /// List serial ports available on this host
    Ports(PortsArgs),
}

/// `panelbridge run`
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Serial port, overriding the configuration
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate, overriding the configuration
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// Forward lines read from stdin to the panel as requests
    #[arg(long)]
    pub stdin: bool,

    /// Print a health snapshot at this interval (e.g. `30s`)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub status_interval: Option<Duration>,
}

/// `panelbridge validate`
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Print the effective configuration when it is valid
    #[arg(short, long)]
    pub show_config: bool,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Fail on warnings too
    #[arg(long)]
    pub strict: bool,
}

/// `panelbridge ports`
#[derive(Args, Debug, Clone, Default)]
pub struct PortsArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Full text with targets and thread ids
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

impl From<panelbridge_config::LogFormat> for LogFormat {
    fn from(format: panelbridge_config::LogFormat) -> Self {
        match format {
            panelbridge_config::LogFormat::Text => LogFormat::Text,
            panelbridge_config::LogFormat::Json => LogFormat::Json,
            panelbridge_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// How subcommands print their result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Subcommand to run, `run` with default arguments when none was given.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Log level forced by `-q`, `-v` or `-l`, if any.
    pub fn log_level_override(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
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
        let cli = Cli::parse_from(["panelbridge"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from([
            "panelbridge",
            "run",
            "--port",
            "/dev/ttyUSB1",
            "--baud-rate",
            "19200",
            "--stdin",
            "--status-interval",
            "30s",
        ]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.port.as_deref(), Some("/dev/ttyUSB1"));
                assert_eq!(args.baud_rate, Some(19200));
                assert!(args.stdin);
                assert_eq!(args.status_interval, Some(Duration::from_secs(30)));
            }
            other => panic!("not a run command: {other:?}"),
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["panelbridge", "validate", "--show-config", "-f", "json"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("not a validate command");
        }
    }

    #[test]
    fn test_ports_command() {
        let cli = Cli::parse_from(["panelbridge", "ports"]);
        assert!(matches!(cli.command, Some(Commands::Ports(_))));
    }

    #[test]
    fn test_config_path_is_global() {
        let cli = Cli::parse_from(["panelbridge", "validate", "-c", "/etc/panelbridge.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/panelbridge.yaml")));
    }

    #[test]
    fn test_log_level_override() {
        let cli = Cli::parse_from(["panelbridge", "-l", "trace"]);
        assert_eq!(cli.log_level_override(), Some("trace"));

        let cli = Cli::parse_from(["panelbridge", "-q", "-l", "trace"]);
        assert_eq!(cli.log_level_override(), Some("warn"));

        let cli = Cli::parse_from(["panelbridge", "-v"]);
        assert_eq!(cli.log_level_override(), Some("debug"));
    }

    #[test]
    fn test_log_format() {
        let cli = Cli::parse_from(["panelbridge", "--log-format", "json"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }
}
