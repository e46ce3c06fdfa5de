//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "gavel", about = "Headless courtroom protocol client")]
pub struct CliArgs {
    /// Master server `host:port`, bypassing SRV discovery.
    #[arg(long)]
    pub master: Option<String>,

    /// Game server `host:port` to join once the master answers.
    #[arg(long)]
    pub server: Option<String>,

    /// Master connect timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref master) = args.master {
            self.master.endpoints = vec![master.clone()];
        }
        if let Some(timeout) = args.timeout_ms {
            self.master.connect_timeout_ms = timeout;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
