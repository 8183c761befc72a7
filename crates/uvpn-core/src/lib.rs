//! Virtual-address allocation and CCD provisioning for OpenVPN route
//! permissions.
//!
//! A provisioning event names a person and the networks they may reach.
//! The [`Provisioner`] resolves the person to an account through a
//! [`Directory`], makes sure the account has a client-config-dir file
//! carrying an address drawn from the [`AddressPool`], and appends one
//! `push "route ..."` directive per destination.
//!
//! - **[`CounterStore`]**: the persisted "next offset" in a
//!   [`KeyValueStore`]. Reads and commits go through an allocation guard
//!   that serializes them within the process.
//! - **[`CcdManager`]**: creates account files and appends to them under
//!   an exclusive advisory lock.
//! - **[`RouteBuilder`]**: hostname / address / CIDR tokens to clauses.
//! - **[`Consumer`]**: NDJSON envelope intake with bounded concurrency.
//! - **[`audit()`]**: read-only consistency scan of the CCD directory.
//!
//! Configuration is built by the caller; nothing here reads config files.

pub mod audit;
pub mod ccd;
pub mod config;
pub mod consumer;
pub mod counter;
pub mod directory;
pub mod error;
pub mod event;
pub mod normalize;
pub mod pool;
pub mod provisioner;
pub mod route;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audit::{AuditReport, AuditRow, AuditStatus, audit};
pub use ccd::CcdManager;
pub use config::{ProvisionerConfig, Subscription, UnresolvablePolicy};
pub use consumer::{ConsumeSummary, Consumer};
pub use counter::CounterStore;
pub use directory::{Directory, Identity, StaticDirectory, Subject};
pub use error::{
    AllocationError, AuditError, CcdError, CounterError, DirectoryError, PoolError,
    ProvisionError, RouteError, StoreError,
};
pub use event::{Destination, Envelope, ProvisioningRequest};
pub use pool::AddressPool;
pub use provisioner::{Allocation, ProvisionOutcome, ProvisionState, Provisioner};
pub use route::{Resolver, RouteBuilder, RouteClause, SystemResolver};
pub use store::{FileStore, KeyValueStore, MemoryStore};
