// ── Core error types ──
//
// One enum per service object, plus `ProvisionError` which names the
// failure exit a provisioning request ended in. Lower-level errors are
// kept as sources so the log line carries the full chain.

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use ipnet::Ipv4Net;
use thiserror::Error;

use crate::provisioner::ProvisionState;

// ── Address pool ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("offset {offset} is outside the assignable range {first}..={last} of pool {pool}")]
    OffsetOutOfRange {
        offset: u32,
        first: u32,
        last: u32,
        pool: Ipv4Net,
    },

    #[error("address {address} is not in pool {pool}")]
    AddressNotInPool { address: Ipv4Addr, pool: Ipv4Net },

    #[error("invalid pool CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },
}

// ── Route clauses ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("destination '{token}' is neither a resolvable host nor a CIDR block")]
    Unresolvable { token: String },
}

// ── Key-value store ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {path} is not a JSON string map: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ── Allocation counter ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("allocation counter '{key}' has not been seeded")]
    CounterMissing { key: String },

    #[error("allocation counter '{key}' holds '{value}', which is not an offset")]
    CounterCorrupt { key: String, value: String },

    #[error("allocation counter '{key}' is already seeded with {current}")]
    AlreadySeeded { key: String, current: String },

    #[error("allocation counter '{key}' could not be accessed")]
    StoreUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },
}

// ── CCD files ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CcdError {
    #[error("'{account}' cannot be used as a CCD file name")]
    InvalidAccountName { account: String },

    #[error("failed to create {path}: {source}")]
    CreateError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    RemoveError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ── Directory ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("failed to read roster {path}: {source}")]
    Roster {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("roster {path} is malformed: {source}")]
    RosterFormat {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

// ── Audit ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot list the CCD directory")]
    Listing(#[source] CcdError),

    #[error("cannot read the allocation counter")]
    Counter(#[from] CounterError),

    #[error("directory lookup failed for account '{account}'")]
    Directory {
        account: String,
        #[source]
        source: DirectoryError,
    },
}

// ── Provisioning ─────────────────────────────────────────────────────

/// Why a new account could not get its address and file.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Ccd(#[from] CcdError),
}

/// Terminal failure of one provisioning request.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("malformed provisioning event: {reason}")]
    Parse { reason: String },

    #[error("directory lookup failed for {subject}")]
    Directory {
        subject: String,
        #[source]
        source: DirectoryError,
    },

    #[error("no directory identity matches {subject}")]
    IdentityNotFound { subject: String },

    #[error("account '{account}' has no usable CCD path")]
    InvalidAccount {
        account: String,
        #[source]
        source: CcdError,
    },

    #[error("address allocation failed for account '{account}'")]
    AllocationFailed {
        account: String,
        #[source]
        source: AllocationError,
    },

    #[error(
        "{path} holds offset {offset} for '{account}' but the counter never committed it \
         ({counter_error}) and the file could not be removed; operator action required"
    )]
    Inconsistent {
        account: String,
        path: PathBuf,
        offset: u32,
        counter_error: CounterError,
        #[source]
        source: CcdError,
    },

    #[error("request for '{account}' rejected: unresolvable destinations {tokens:?}")]
    Rejected { account: String, tokens: Vec<String> },

    #[error("failed to apply routes for account '{account}'")]
    WriteFailed {
        account: String,
        #[source]
        source: CcdError,
    },
}

impl ProvisionError {
    /// The failure exit of the provisioning state machine.
    pub fn state(&self) -> ProvisionState {
        match self {
            Self::Parse { .. } => ProvisionState::ParseError,
            Self::Directory { .. } => ProvisionState::DirectoryFailed,
            Self::IdentityNotFound { .. } => ProvisionState::IdentityNotFound,
            Self::InvalidAccount { .. }
            | Self::AllocationFailed { .. }
            | Self::Inconsistent { .. } => ProvisionState::AllocationFailed,
            Self::Rejected { .. } => ProvisionState::Rejected,
            Self::WriteFailed { .. } => ProvisionState::WriteFailed,
        }
    }

    /// Counter and filesystem disagree and nothing was rolled back.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Inconsistent { .. })
    }
}
