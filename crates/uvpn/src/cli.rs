//! Clap derive structures for the `uvpn` CLI.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// uvpn -- provision per-user OpenVPN route permissions
#[derive(Debug, Parser)]
#[command(
    name = "uvpn",
    version,
    about = "Provision per-user OpenVPN route permissions from ticket events",
    long_about = "Consumes provisioning events, assigns each new account a virtual\n\
        address from the client pool, and appends route directives to the\n\
        account's OpenVPN client-config-dir file.",
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
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "UVPN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, env = "UVPN_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "UVPN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Consume provisioning events (NDJSON envelopes) and apply them
    Run(RunArgs),

    /// Cross-check CCD files against the directory, pool and counter
    Audit,

    /// Inspect or seed the allocation counter
    Counter(CounterArgs),

    /// Convert between pool offsets and addresses
    Pool(PoolArgs),

    /// Clean up destination tokens, optionally wrapping them in an event
    #[command(alias = "norm")]
    Normalize(NormalizeArgs),

    /// Show the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Envelope source: a file, or `-` for stdin
    #[arg(long, short = 'e', default_value = "-")]
    pub events: PathBuf,
}

// ── Counter ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CounterArgs {
    #[command(subcommand)]
    pub command: CounterCommand,
}

#[derive(Debug, Subcommand)]
pub enum CounterCommand {
    /// Print the next offset to be assigned
    Show,

    /// Set the next offset to be assigned
    Seed {
        /// Offset within the pool's assignable range
        value: u32,

        /// Overwrite an existing counter
        #[arg(long)]
        force: bool,
    },
}

// ── Pool ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PoolArgs {
    #[command(subcommand)]
    pub command: PoolCommand,
}

#[derive(Debug, Subcommand)]
pub enum PoolCommand {
    /// Describe the configured pool
    Show,

    /// Address for an offset
    Address {
        offset: u32,
    },

    /// Offset of an address
    Offset {
        address: Ipv4Addr,
    },
}

// ── Normalize ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Destination tokens: hostnames, addresses or CIDR blocks
    #[arg(required = true)]
    pub tokens: Vec<String>,

    /// Display name; with --id, print an event envelope instead
    #[arg(long, requires = "id")]
    pub name: Option<String>,

    /// Employee number
    #[arg(long, requires = "name")]
    pub id: Option<String>,

    /// Ticket name recorded in the event
    #[arg(long, requires = "name")]
    pub ticket: Option<String>,

    /// Message id recorded in the envelope
    #[arg(long, requires = "name")]
    pub msg_id: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the merged configuration as TOML
    Show,

    /// Print the config file path in use
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
