// ── Provisioning orchestrator ──
//
// Drives one request through the state machine:
//
//   Received → IdentityResolved → FileEnsured → RoutesBuilt → Applied → Done
//
// Failures exit through one of the error states named by
// `ProvisionError::state`. Nothing is retried. A new account's address is
// allocated with the counter's guard held from the first read to the
// commit, and a created file whose counter commit failed is removed again.
// With redelivery dedupe on, deliveries sharing a marker run one at a time
// so the second sees the first's marker.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use strum::Display;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::ccd::CcdManager;
use crate::config::{ProvisionerConfig, UnresolvablePolicy};
use crate::counter::CounterStore;
use crate::directory::{Directory, Identity};
use crate::error::{AllocationError, CounterError, ProvisionError, StoreError};
use crate::event::{Envelope, ProvisioningRequest};
use crate::pool::AddressPool;
use crate::route::{self, Resolver, RouteBuilder, RouteClause};
use crate::store::KeyValueStore;

const APPLIED_MARKER_PREFIX: &str = "uvpn:applied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProvisionState {
    Received,
    IdentityResolved,
    FileEnsured,
    RoutesBuilt,
    Applied,
    Done,
    // ── Failure exits ──
    ParseError,
    DirectoryFailed,
    IdentityNotFound,
    AllocationFailed,
    Rejected,
    WriteFailed,
}

/// An address handed to an account that had no CCD file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub offset: u32,
    pub address: Ipv4Addr,
}

/// What a successful request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub account: String,
    pub path: PathBuf,
    /// `Some` when the account's file was created by this request.
    pub allocation: Option<Allocation>,
    /// Clauses appended, in request order.
    pub clauses: Vec<RouteClause>,
    /// Tokens that produced no clause.
    pub skipped: Vec<String>,
    /// A redelivery that had already been applied; nothing was written.
    pub duplicate: bool,
}

impl ProvisionOutcome {
    pub fn clause_text(&self) -> String {
        route::render(&self.clauses)
    }
}

pub struct Provisioner {
    pool: AddressPool,
    counter: CounterStore,
    ccd: CcdManager,
    routes: RouteBuilder,
    directory: Arc<dyn Directory>,
    store: Arc<dyn KeyValueStore>,
    unresolvable: UnresolvablePolicy,
    dedupe_redelivery: bool,
    applied_retention_days: u32,
    /// One lock per redelivery marker currently being applied.
    applying: DashMap<String, Arc<Mutex<()>>>,
}

impl Provisioner {
    /// The counter lives in `store`; the redelivery ledger shares it.
    pub fn new(
        config: &ProvisionerConfig,
        directory: Arc<dyn Directory>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let pool = AddressPool::new(config.pool);
        let ccd = CcdManager::new(
            &config.ccd_dir,
            &config.assignment_template,
            pool.netmask(),
        );
        Self {
            counter: CounterStore::new(Arc::clone(&store), &config.counter_key),
            pool,
            ccd,
            routes: RouteBuilder::system(),
            directory,
            store,
            unresolvable: config.unresolvable,
            dedupe_redelivery: config.dedupe_redelivery,
            applied_retention_days: config.applied_retention_days,
            applying: DashMap::new(),
        }
    }

    /// Replace the system resolver used for destination hostnames.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.routes = RouteBuilder::new(resolver);
        self
    }

    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }

    pub fn counter(&self) -> &CounterStore {
        &self.counter
    }

    pub fn ccd(&self) -> &CcdManager {
        &self.ccd
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Process one delivered envelope and log how it ended.
    pub async fn handle(&self, envelope: &Envelope) -> Result<ProvisionOutcome, ProvisionError> {
        let span = info_span!(
            "provision",
            msg_id = envelope.msg_id.as_deref().unwrap_or("-"),
        );

        async {
            let stored = envelope
                .stored_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());
            info!(
                state = %ProvisionState::Received,
                topic = %envelope.topic,
                stored = stored.as_deref().unwrap_or("-"),
                "event received"
            );

            let result = match envelope.request() {
                Ok(request) => {
                    if let Some(ticket) = &request.ticket {
                        debug!(ticket, "ticket");
                    }
                    self.provision(&request, envelope.msg_id.as_deref()).await
                }
                Err(e) => Err(e),
            };

            match &result {
                Ok(outcome) => info!(
                    state = %ProvisionState::Done,
                    account = %outcome.account,
                    duplicate = outcome.duplicate,
                    clauses = %outcome.clause_text(),
                    "provisioning complete"
                ),
                Err(e) if e.is_fatal() => {
                    error!(state = %e.state(), error = %e, "provisioning failed");
                }
                Err(e) => warn!(state = %e.state(), error = %e, "provisioning failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run a decoded request. `msg_id` keys redelivery detection.
    pub async fn provision(
        &self,
        request: &ProvisioningRequest,
        msg_id: Option<&str>,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let identity = self.resolve(request).await?;
        let account = identity.account;
        info!(state = %ProvisionState::IdentityResolved, %account, "identity resolved");

        let path = self
            .ccd
            .path_for(&account)
            .map_err(|source| ProvisionError::InvalidAccount {
                account: account.clone(),
                source,
            })?;

        let marker = msg_id
            .filter(|_| self.dedupe_redelivery)
            .map(|id| applied_marker(id, &account));
        let _applying = match &marker {
            Some(key) => Some(self.hold_marker(key).await),
            None => None,
        };
        if let Some(key) = &marker {
            if self.already_applied(key).await {
                info!(%account, "redelivered event already applied; skipping");
                return Ok(ProvisionOutcome {
                    account,
                    path,
                    allocation: None,
                    clauses: Vec::new(),
                    skipped: Vec::new(),
                    duplicate: true,
                });
            }
        }

        let allocation = self.ensure_file(&account, &path).await?;
        debug!(
            state = %ProvisionState::FileEnsured,
            path = %path.display(),
            created = allocation.is_some(),
            "CCD file ready"
        );

        let batch = self.routes.build_all(&request.tokens()).await;
        debug!(
            state = %ProvisionState::RoutesBuilt,
            built = batch.clauses.len(),
            skipped = batch.skipped.len(),
            "route clauses built"
        );
        if !batch.skipped.is_empty() && self.unresolvable == UnresolvablePolicy::Reject {
            return Err(ProvisionError::Rejected {
                account,
                tokens: batch.skipped,
            });
        }

        if batch.clauses.is_empty() {
            debug!(%account, "no route clauses to apply");
        } else {
            self.ccd
                .append_clauses(&path, &batch.clauses)
                .await
                .map_err(|source| ProvisionError::WriteFailed {
                    account: account.clone(),
                    source,
                })?;
            info!(
                state = %ProvisionState::Applied,
                %account,
                clauses = batch.clauses.len(),
                "routes applied"
            );
        }

        if let Some(key) = &marker {
            self.record_applied(key).await;
        }

        Ok(ProvisionOutcome {
            account,
            path,
            allocation,
            clauses: batch.clauses,
            skipped: batch.skipped,
            duplicate: false,
        })
    }

    async fn resolve(&self, request: &ProvisioningRequest) -> Result<Identity, ProvisionError> {
        let subject = request.subject();
        self.directory
            .lookup(&subject)
            .await
            .map_err(|source| ProvisionError::Directory {
                subject: subject.to_string(),
                source,
            })?
            .ok_or_else(|| ProvisionError::IdentityNotFound {
                subject: subject.to_string(),
            })
    }

    /// Make sure the account has a file, allocating an address if not.
    async fn ensure_file(
        &self,
        account: &str,
        path: &Path,
    ) -> Result<Option<Allocation>, ProvisionError> {
        if self.ccd.exists(path).await {
            return Ok(None);
        }

        let guard = self.counter.begin().await;
        if self.ccd.exists(path).await {
            debug!(account, "CCD file created by a concurrent request");
            return Ok(None);
        }

        let failed = |source: AllocationError| ProvisionError::AllocationFailed {
            account: account.to_owned(),
            source,
        };

        let (offset, token) = guard.peek().await.map_err(|e| failed(e.into()))?;
        let address = self
            .pool
            .offset_to_address(offset)
            .map_err(|e| failed(e.into()))?;
        self.ccd
            .create_with_assignment(path, address)
            .await
            .map_err(|e| failed(e.into()))?;

        if let Err(counter_error) = guard.advance(token).await {
            return Err(self.compensate(account, path, offset, counter_error).await);
        }

        info!(account, %address, offset, "allocated virtual address");
        Ok(Some(Allocation { offset, address }))
    }

    /// Undo a file creation whose counter commit failed.
    async fn compensate(
        &self,
        account: &str,
        path: &Path,
        offset: u32,
        counter_error: CounterError,
    ) -> ProvisionError {
        match self.ccd.remove(path).await {
            Ok(()) => {
                warn!(
                    account,
                    offset,
                    error = %counter_error,
                    "counter commit failed; new CCD file removed"
                );
                ProvisionError::AllocationFailed {
                    account: account.to_owned(),
                    source: counter_error.into(),
                }
            }
            Err(source) => {
                error!(
                    account,
                    offset,
                    path = %path.display(),
                    counter_error = %counter_error,
                    remove_error = %source,
                    "CCD file holds an uncommitted address and could not be removed"
                );
                ProvisionError::Inconsistent {
                    account: account.to_owned(),
                    path: path.to_path_buf(),
                    offset,
                    counter_error,
                    source,
                }
            }
        }
    }

    /// Wait until no other delivery holds `key`, then hold it.
    async fn hold_marker(&self, key: &str) -> MarkerGuard<'_> {
        let lock = self.applying.entry(key.to_owned()).or_default().clone();
        MarkerGuard {
            applying: &self.applying,
            key: key.to_owned(),
            held: Some(lock.lock_owned().await),
        }
    }

    /// Drop redelivery markers older than the configured retention.
    pub async fn prune_applied(&self) -> Result<usize, StoreError> {
        if self.applied_retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - TimeDelta::days(i64::from(self.applied_retention_days));
        self.prune_applied_before(cutoff).await
    }

    /// Drop markers recorded before `cutoff`, and any without a readable
    /// timestamp. Returns how many were removed.
    pub async fn prune_applied_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut expired = Vec::new();
        for key in self.store.keys(&format!("{APPLIED_MARKER_PREFIX}:")).await? {
            let recorded = self
                .store
                .get(&key)
                .await?
                .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|t| t.with_timezone(&Utc));
            if recorded.is_none_or(|t| t < cutoff) {
                expired.push(key);
            }
        }
        self.store.delete_all(&expired).await?;
        if !expired.is_empty() {
            info!(pruned = expired.len(), %cutoff, "pruned redelivery markers");
        }
        Ok(expired.len())
    }

    async fn already_applied(&self, key: &str) -> bool {
        match self.store.get(key).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(key, error = %e, "redelivery ledger unavailable; applying anyway");
                false
            }
        }
    }

    async fn record_applied(&self, key: &str) {
        let stamp = Utc::now().to_rfc3339();
        if let Err(e) = self.store.set(key, &stamp).await {
            warn!(key, error = %e, "failed to record applied event");
        }
    }
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("pool", &self.pool)
            .field("ccd", &self.ccd)
            .field("counter", &self.counter)
            .field("unresolvable", &self.unresolvable)
            .field("dedupe_redelivery", &self.dedupe_redelivery)
            .finish_non_exhaustive()
    }
}

/// Holds one marker's lock; forgets the lock once nobody waits on it.
struct MarkerGuard<'a> {
    applying: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for MarkerGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.applying
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn applied_marker(msg_id: &str, account: &str) -> String {
    format!("{APPLIED_MARKER_PREFIX}:{msg_id}:{account}")
}
