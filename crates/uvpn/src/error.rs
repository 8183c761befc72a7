//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and a distinct exit code per class.

use miette::Diagnostic;
use thiserror::Error;

use uvpn_config::ConfigError;
use uvpn_core::{AuditError, CcdError, CounterError, DirectoryError, PoolError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const STORE: i32 = 4;
    pub const IO: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error")]
    #[diagnostic(
        code(uvpn::config),
        help(
            "Check the config file and UVPN_* environment variables.\n\
             Run: uvpn config show"
        )
    )]
    Config(#[source] Box<ConfigError>),

    #[error("Could not load the user roster")]
    #[diagnostic(
        code(uvpn::directory),
        help("Set [directory] roster in the config file to a TOML file of [[users]] entries.")
    )]
    Directory(#[from] DirectoryError),

    #[error("Cannot open log file {path}: {reason}")]
    #[diagnostic(code(uvpn::log_file))]
    LogFile { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(uvpn::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(uvpn::pool), help("Run: uvpn pool show"))]
    Pool(#[from] PoolError),

    // ── Counter / store ──────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(uvpn::counter),
        help(
            "Inspect it with: uvpn counter show\n\
             Seed or correct it with: uvpn counter seed <offset> [--force]"
        )
    )]
    Counter(#[from] CounterError),

    // ── CCD files ────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(uvpn::ccd))]
    Ccd(#[from] CcdError),

    #[error("Audit could not complete")]
    #[diagnostic(code(uvpn::audit))]
    Audit(#[from] AuditError),

    #[error("Audit found {count} CCD file(s) needing attention")]
    #[diagnostic(code(uvpn::audit_findings))]
    AuditFindings { count: usize },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(uvpn::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. }
            | Self::Pool(_)
            | Self::Counter(CounterError::AlreadySeeded { .. }) => exit_code::USAGE,
            Self::Config(_) | Self::Directory(_) | Self::LogFile { .. } => exit_code::CONFIG,
            Self::Counter(_) => exit_code::STORE,
            Self::Ccd(_) | Self::Audit(_) | Self::Io(_) => exit_code::IO,
            Self::AuditFindings { .. } | Self::Json(_) => exit_code::GENERAL,
        }
    }
}
