// ── Runtime provisioner configuration ──
//
// These types describe what the provisioner allocates from and writes to.
// They never touch disk: `uvpn-config` builds a `ProvisionerConfig` from
// the config file and environment and hands it in.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ccd::DEFAULT_ASSIGNMENT_TEMPLATE;
use crate::counter::DEFAULT_COUNTER_KEY;

/// Pool the deployment has always assigned from.
pub const DEFAULT_POOL: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(10, 11, 0, 0), 16);

pub const DEFAULT_CCD_DIR: &str = "/etc/openvpn/ccd";

/// How long redelivery markers are kept before pruning.
pub const DEFAULT_APPLIED_RETENTION_DAYS: u32 = 30;

/// What to do with a destination that yields no route clause.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnresolvablePolicy {
    /// Log it, report it in the outcome, and apply the rest.
    #[default]
    Skip,
    /// Fail the whole request before anything is written.
    Reject,
}

/// Everything the `Provisioner` needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    pub pool: Ipv4Net,
    pub ccd_dir: PathBuf,
    /// Assignment line with `{address}` and `{netmask}` placeholders.
    pub assignment_template: String,
    pub counter_key: String,
    pub unresolvable: UnresolvablePolicy,
    /// Record applied `(message id, account)` pairs and skip redeliveries.
    pub dedupe_redelivery: bool,
    /// Markers older than this are pruned; 0 keeps them forever. Every
    /// marker lives in the same store as the counter, so an unbounded
    /// ledger slows down each counter commit on a file store.
    pub applied_retention_days: u32,
}

impl ProvisionerConfig {
    pub fn new(ccd_dir: impl Into<PathBuf>) -> Self {
        Self {
            ccd_dir: ccd_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            pool: DEFAULT_POOL,
            ccd_dir: PathBuf::from(DEFAULT_CCD_DIR),
            assignment_template: DEFAULT_ASSIGNMENT_TEMPLATE.to_owned(),
            counter_key: DEFAULT_COUNTER_KEY.to_owned(),
            unresolvable: UnresolvablePolicy::Skip,
            dedupe_redelivery: false,
            applied_retention_days: DEFAULT_APPLIED_RETENTION_DAYS,
        }
    }
}

/// Which envelopes the consumer accepts, and how many run at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    /// `None` accepts any tag.
    pub tag: Option<String>,
    pub max_in_flight: usize,
}

impl Subscription {
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            tag: None,
            max_in_flight: Self::DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn accepts(&self, topic: &str, tag: Option<&str>) -> bool {
        topic == self.topic
            && match (&self.tag, tag) {
                (None, _) => true,
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
            }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            topic: "UVPN".into(),
            tag: Some("UVPN".into()),
            max_in_flight: Self::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}
