// ── Allocation counter ──
//
// The "next offset to assign" lives in the key-value store as a decimal
// string. Reading and committing it is only possible through an
// `AllocationGuard`, which holds the counter's mutex for the whole
// peek → allocate → advance sequence. Two requests in this process can
// therefore never see the same offset. Separate processes sharing the
// store are not coordinated.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::CounterError;
use crate::store::KeyValueStore;

/// Key the counter is stored under unless configured otherwise.
pub const DEFAULT_COUNTER_KEY: &str = "OVPNVIP";

/// The counter's string form as it was read, needed to commit or undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterToken(String);

impl CounterToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct CounterStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    lock: Mutex<()>,
}

impl CounterStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Enter the allocation critical section. Waits for any other holder.
    pub async fn begin(&self) -> AllocationGuard<'_> {
        AllocationGuard {
            counter: self,
            _lock: self.lock.lock().await,
        }
    }

    /// Read the counter outside the critical section, for diagnostics.
    pub async fn current(&self) -> Result<Option<u32>, CounterError> {
        match self.read().await? {
            Some(raw) => self.parse(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Write the initial counter value.
    ///
    /// Refuses to overwrite an existing counter unless `force` is set.
    pub async fn seed(&self, value: u32, force: bool) -> Result<(), CounterError> {
        let _lock = self.lock.lock().await;
        if !force {
            if let Some(current) = self.read().await? {
                return Err(CounterError::AlreadySeeded {
                    key: self.key.clone(),
                    current,
                });
            }
        }
        self.write(value).await
    }

    async fn read(&self) -> Result<Option<String>, CounterError> {
        self.store
            .get(&self.key)
            .await
            .map_err(|source| CounterError::StoreUnavailable {
                key: self.key.clone(),
                source,
            })
    }

    async fn write(&self, value: u32) -> Result<(), CounterError> {
        self.store
            .set(&self.key, &value.to_string())
            .await
            .map_err(|source| CounterError::StoreUnavailable {
                key: self.key.clone(),
                source,
            })
    }

    fn parse(&self, raw: &str) -> Result<u32, CounterError> {
        raw.trim().parse().map_err(|_| CounterError::CounterCorrupt {
            key: self.key.clone(),
            value: raw.to_owned(),
        })
    }
}

impl std::fmt::Debug for CounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the counter. Dropping it ends the critical section.
pub struct AllocationGuard<'a> {
    counter: &'a CounterStore,
    _lock: MutexGuard<'a, ()>,
}

impl AllocationGuard<'_> {
    /// Current counter value and the token needed to advance it.
    pub async fn peek(&self) -> Result<(u32, CounterToken), CounterError> {
        let raw = self
            .counter
            .read()
            .await?
            .ok_or_else(|| CounterError::CounterMissing {
                key: self.counter.key.clone(),
            })?;
        let value = self.counter.parse(&raw)?;
        Ok((value, CounterToken(raw)))
    }

    /// Commit `token + 1` as the next offset. Returns the written value.
    pub async fn advance(&self, token: CounterToken) -> Result<u32, CounterError> {
        let next = self
            .counter
            .parse(token.as_str())?
            .checked_add(1)
            .ok_or_else(|| CounterError::CounterCorrupt {
                key: self.counter.key.clone(),
                value: token.0.clone(),
            })?;
        self.counter.write(next).await?;
        debug!(key = %self.counter.key, next, "allocation counter advanced");
        Ok(next)
    }
}
