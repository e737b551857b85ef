//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::protocol::ProtocolKind;
use crate::scenario::ScenarioKind;

/// Startline - countdown latch starting-line experiments
#[derive(Parser)]
#[command(
    name = "sl",
    about = "Race runner threads against a judge to expose missed starts",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run protocols against delay scenarios
    Run {
        /// Protocol to run (repeatable; default: all from config)
        #[arg(short, long = "protocol", value_name = "PROTOCOL")]
        protocols: Vec<ProtocolKind>,

        /// Standard scenario to run (repeatable; default: all three)
        #[arg(short, long = "scenario", value_name = "SCENARIO", conflicts_with_all = ["judge_delay", "runner_delay"])]
        scenarios: Vec<ScenarioKind>,

        /// Runner threads per race
        #[arg(short, long)]
        runners: Option<usize>,

        /// Delay for the standard scenarios in milliseconds
        #[arg(short, long)]
        delay: Option<u64>,

        /// Custom scenario: judge delay in milliseconds
        #[arg(long)]
        judge_delay: Option<u64>,

        /// Custom scenario: runner delay in milliseconds
        #[arg(long)]
        runner_delay: Option<u64>,

        /// Races per protocol and scenario
        #[arg(short = 'n', long)]
        rounds: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List available protocols
    Protocols,
}

/// Output format for run reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
