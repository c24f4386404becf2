//! CLI command definitions for the `repolens` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod ask;
pub mod chat;
pub mod doctor;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Ask questions about GitHub repositories.
#[derive(Parser)]
#[command(name = "repolens", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to config.toml (defaults to `<data dir>/config.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides config and PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config and HOST).
        #[arg(long)]
        host: Option<String>,
    },

    /// Interactive chat in the terminal.
    Chat {
        /// Resume an existing session instead of starting a new one.
        #[arg(long)]
        session: Option<String>,
    },

    /// Ask a single question and exit.
    Ask {
        /// The question, e.g. "what is https://github.com/tokio-rs/axum?".
        query: String,

        /// Session to record the exchange in.
        #[arg(long)]
        session: Option<String>,
    },

    /// Check configuration, storage and model connectivity.
    Doctor,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Fresh identifier for a session or request.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
