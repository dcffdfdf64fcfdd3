//! CLI command definitions for the `coffeemate` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod run;
pub mod schedule;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Daily random-coffee signups and group matching for chats.
#[derive(Parser)]
#[command(name = "coffeemate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a config.toml (default: <data dir>/config.toml).
    #[arg(long, global = true, env = "COFFEEMATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon: read events from stdin, write messages to stdout,
    /// post daily invites and close expired signups.
    Run {
        /// Test mode: 1 minute signup window, 5 s closer, no daily loop,
        /// invites sent at startup.
        #[arg(long)]
        test: bool,
    },

    /// Post today's invite to every known chat and exit.
    #[command(name = "invite-once")]
    InviteOnce,

    /// Set the daily invite time (UTC, HH:MM).
    #[command(name = "set-time")]
    SetTime {
        /// Time of day, e.g. 08:30.
        time: String,
    },

    /// Show configuration and storage status.
    Status {
        /// Output machine-readable JSON instead of styled text.
        #[arg(long)]
        json: bool,
    },
}
