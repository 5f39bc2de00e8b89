//! Clap derive structures for the `hassnotify` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hassnotify -- location-change push notifications for Home Assistant
#[derive(Debug, Parser)]
#[command(
    name = "hassnotify",
    version,
    about = "Notify household members when someone arrives at or leaves a place",
    long_about = "Watches Home Assistant person entities over the WebSocket API and\n\
        pushes arrived/left notifications to everyone else's mobile app.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file (TOML, or YAML for .yaml/.yml)
    #[arg(long, short = 'c', env = "HASSNOTIFY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to Home Assistant and send notifications until interrupted
    Run,

    /// Inspect and validate configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path in use
    Path,

    /// Load and validate the config, then print a summary
    Check {
        /// Also verify that Home Assistant accepts the connection
        #[arg(long)]
        connect: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
