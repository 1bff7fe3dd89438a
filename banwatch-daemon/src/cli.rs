//! CLI argument definitions for banwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Banwatch proxy-ban daemon.
///
/// Tails game server logs, scores connecting IPs against an IP
/// reputation service, and appends offenders to the shared banlist.
#[derive(Parser, Debug)]
#[command(name = "banwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to banwatch.toml configuration file.
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
