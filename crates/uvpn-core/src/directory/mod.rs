// ── Directory collaborator ──
//
// Maps the person named in a request to the account whose CCD file they
// own. The organisation's directory keys people by common name, which is
// the display name with the employee number appended.

mod roster;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

pub use roster::StaticDirectory;

/// Who a provisioning request is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    pub display_name: String,
    pub employee_id: String,
}

impl Subject {
    pub fn new(display_name: impl Into<String>, employee_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            employee_id: employee_id.into(),
        }
    }

    /// Directory common name: display name immediately followed by the id.
    pub fn common_name(&self) -> String {
        format!("{}{}", self.display_name, self.employee_id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.employee_id)
    }
}

/// A resolved directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Canonical login name; also the CCD file name.
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

impl Identity {
    pub fn common_name(&self) -> Option<String> {
        match (&self.display_name, &self.employee_id) {
            (Some(name), Some(id)) => Some(format!("{name}{id}")),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(None)` when nobody matches.
    async fn lookup(&self, subject: &Subject) -> Result<Option<Identity>, DirectoryError>;

    /// Entry for a known account name, used when auditing CCD files.
    async fn find_account(&self, account: &str) -> Result<Option<Identity>, DirectoryError>;
}
