//! CLI command definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

/// promptcal - prompt strategy calibration for tool-calling agents
#[derive(Parser, Debug)]
#[command(
    name = "pcal",
    about = "Find the prompt phrasing each tool responds to best",
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
    /// Calibrate one server, or every configured server
    Calibrate {
        /// Server name from config
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        server: Option<String>,

        /// Calibrate every configured server, one after another
        #[arg(short, long)]
        all: bool,

        /// Run probes but do not save the mapping
        #[arg(long)]
        dry_run: bool,

        /// Write the calibration report as JSON to this path
        #[arg(short, long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// List configured servers
    Servers,

    /// List prompt strategies in registration order
    Strategies,

    /// Show the saved strategy mapping
    Show {
        /// Only show this server
        server: Option<String>,
    },

    /// Render the instruction for a tool with its calibrated strategy
    Prompt {
        /// Server name
        server: String,

        /// Tool name
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, value_name = "JSON")]
        params: Option<String>,
    },
}

/// Default log file location
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptcal")
        .join("logs")
        .join("promptcal.log")
}
