//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::commands::Commands;

/// Authenticated API client with transparent token renewal.
#[derive(Parser, Debug)]
#[command(name = "tokenflight")]
#[command(author, version = env!("TOKENFLIGHT_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the API lives and how long renewal may take.
///
/// Flags win over environment variables, which win over the config file.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// API base URL
    #[arg(long, env = "TOKENFLIGHT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Upper bound on a single renewal call, in milliseconds
    #[arg(long, env = "TOKENFLIGHT_RENEWAL_TIMEOUT_MS", global = true)]
    pub renewal_timeout_ms: Option<u64>,

    /// Path to a JSON client config (defaults to the platform config dir)
    #[arg(long, env = "TOKENFLIGHT_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}
