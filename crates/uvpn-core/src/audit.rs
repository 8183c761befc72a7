// ── CCD audit ──
//
// Read-only cross-check of every file in the CCD directory against the
// directory service, the pool and the allocation counter.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use strum::Display;
use tracing::{debug, warn};

use crate::error::AuditError;
use crate::provisioner::Provisioner;

/// Worst finding for one file. Variants are ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum AuditStatus {
    Ok,
    /// Offset at or above the counter: the next allocation would reuse it.
    AboveCounter,
    /// Another file carries the same address.
    Duplicate,
    /// No directory entry for the account.
    Orphan,
    OutsidePool,
    NoAssignment,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub account: String,
    pub address: Option<Ipv4Addr>,
    pub offset: Option<u32>,
    pub status: AuditStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Counter value at the time of the scan.
    pub counter: Option<u32>,
    /// One row per file, sorted by account.
    pub rows: Vec<AuditRow>,
}

impl AuditReport {
    pub fn problems(&self) -> impl Iterator<Item = &AuditRow> {
        self.rows.iter().filter(|row| row.status != AuditStatus::Ok)
    }
}

pub async fn audit(provisioner: &Provisioner) -> Result<AuditReport, AuditError> {
    let ccd = provisioner.ccd();
    let pool = provisioner.pool();
    let counter = provisioner.counter().current().await?;
    let accounts = ccd.list().await.map_err(AuditError::Listing)?;
    debug!(dir = %ccd.dir().display(), files = accounts.len(), ?counter, "auditing CCD directory");

    let mut rows = Vec::with_capacity(accounts.len());
    for account in accounts {
        let known = provisioner
            .directory()
            .find_account(&account)
            .await
            .map_err(|source| AuditError::Directory {
                account: account.clone(),
                source,
            })?
            .is_some();

        let mut row = AuditRow {
            account,
            address: None,
            offset: None,
            status: if known { AuditStatus::Ok } else { AuditStatus::Orphan },
        };

        let path = ccd.dir().join(&row.account);
        match ccd.read_assignment(&path).await {
            Err(e) => {
                warn!(error = %e, "unreadable CCD file");
                row.status = AuditStatus::Unreadable;
            }
            Ok(None) => row.status = AuditStatus::NoAssignment,
            Ok(Some(address)) => {
                row.address = Some(address);
                match pool.address_to_offset(address) {
                    Err(_) => row.status = AuditStatus::OutsidePool,
                    Ok(offset) => {
                        row.offset = Some(offset);
                        if counter.is_some_and(|next| offset >= next) {
                            row.status = row.status.max(AuditStatus::AboveCounter);
                        }
                    }
                }
            }
        }
        rows.push(row);
    }

    let mut holders: HashMap<Ipv4Addr, usize> = HashMap::new();
    for address in rows.iter().filter_map(|row| row.address) {
        *holders.entry(address).or_default() += 1;
    }
    for row in &mut rows {
        if row.address.is_some_and(|a| holders.get(&a).copied().unwrap_or(0) > 1) {
            row.status = row.status.max(AuditStatus::Duplicate);
        }
    }

    Ok(AuditReport { counter, rows })
}
