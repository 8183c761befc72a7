//! Configuration for the UVPN provisioner.
//!
//! A TOML file plus `UVPN_`-prefixed environment overrides, validated and
//! translated into `uvpn_core::ProvisionerConfig` and `Subscription`.
//! The binary adds its command-line overrides on top.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use uvpn_core::ccd::DEFAULT_ASSIGNMENT_TEMPLATE;
use uvpn_core::config::{DEFAULT_APPLIED_RETENTION_DAYS, DEFAULT_CCD_DIR, DEFAULT_POOL};
use uvpn_core::counter::DEFAULT_COUNTER_KEY;
use uvpn_core::{ProvisionerConfig, Subscription, UnresolvablePolicy};

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "UVPN_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolSection,
    #[serde(default)]
    pub ccd: CcdSection,
    #[serde(default)]
    pub counter: CounterSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub directory: DirectorySection,
    #[serde(default)]
    pub consumer: ConsumerSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolSection {
    /// Client address block, e.g. "10.11.0.0/16".
    #[serde(default = "default_cidr")]
    pub cidr: String,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CcdSection {
    #[serde(default = "default_ccd_dir")]
    pub dir: PathBuf,

    /// Used instead of `dir` when `dev` is set.
    pub dev_dir: Option<PathBuf>,

    #[serde(default)]
    pub dev: bool,

    #[serde(default = "default_assignment_template")]
    pub assignment_template: String,
}

impl Default for CcdSection {
    fn default() -> Self {
        Self {
            dir: default_ccd_dir(),
            dev_dir: None,
            dev: false,
            assignment_template: default_assignment_template(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CounterSection {
    #[serde(default = "default_counter_key")]
    pub key: String,
}

impl Default for CounterSection {
    fn default() -> Self {
        Self {
            key: default_counter_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSection {
    /// JSON file holding the counter and the redelivery ledger.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectorySection {
    /// TOML roster of `[[users]]` entries.
    #[serde(default = "default_roster")]
    pub roster: PathBuf,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            roster: default_roster(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConsumerSection {
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Required tag; unset accepts any.
    #[serde(default = "default_tag")]
    pub tag: Option<String>,

    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default)]
    pub unresolvable: UnresolvablePolicy,

    /// Skip redelivered envelopes already applied. Each applied event
    /// leaves a marker in the store until `applied_retention_days` pass.
    #[serde(default)]
    pub dedupe_redelivery: bool,

    /// Days to keep redelivery markers; 0 keeps them forever, and the
    /// store then grows by one entry per applied event.
    #[serde(default = "default_applied_retention_days")]
    pub applied_retention_days: u32,
}

impl Default for ConsumerSection {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            tag: default_tag(),
            max_in_flight: default_max_in_flight(),
            unresolvable: UnresolvablePolicy::default(),
            dedupe_redelivery: false,
            applied_retention_days: default_applied_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSection {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

fn default_cidr() -> String {
    DEFAULT_POOL.to_string()
}
fn default_ccd_dir() -> PathBuf {
    DEFAULT_CCD_DIR.into()
}
fn default_assignment_template() -> String {
    DEFAULT_ASSIGNMENT_TEMPLATE.into()
}
fn default_counter_key() -> String {
    DEFAULT_COUNTER_KEY.into()
}
fn default_store_path() -> PathBuf {
    "/var/lib/uvpn/store.json".into()
}
fn default_roster() -> PathBuf {
    "/etc/uvpn/roster.toml".into()
}
fn default_topic() -> String {
    "UVPN".into()
}
#[allow(clippy::unnecessary_wraps)]
fn default_tag() -> Option<String> {
    Some("UVPN".into())
}
fn default_applied_retention_days() -> u32 {
    DEFAULT_APPLIED_RETENTION_DAYS
}
fn default_max_in_flight() -> usize {
    Subscription::DEFAULT_MAX_IN_FLIGHT
}

// ── Translation to runtime config ───────────────────────────────────

impl Config {
    /// The CCD directory in effect, honouring dev mode.
    pub fn ccd_dir(&self) -> Result<&Path, ConfigError> {
        let dir = if self.ccd.dev {
            self.ccd
                .dev_dir
                .as_deref()
                .ok_or_else(|| invalid("ccd.dev_dir", "dev mode is on but no dev_dir is set"))?
        } else {
            self.ccd.dir.as_path()
        };
        if dir.as_os_str().is_empty() {
            return Err(invalid("ccd.dir", "must not be empty"));
        }
        Ok(dir)
    }

    pub fn pool(&self) -> Result<Ipv4Net, ConfigError> {
        self.pool
            .cidr
            .trim()
            .parse()
            .map_err(|e| invalid("pool.cidr", format!("'{}': {e}", self.pool.cidr)))
    }

    pub fn to_provisioner_config(&self) -> Result<ProvisionerConfig, ConfigError> {
        let template = &self.ccd.assignment_template;
        if !template.contains("{address}") {
            return Err(invalid(
                "ccd.assignment_template",
                format!("'{template}' has no {{address}} placeholder"),
            ));
        }
        if self.counter.key.trim().is_empty() {
            return Err(invalid("counter.key", "must not be empty"));
        }

        Ok(ProvisionerConfig {
            pool: self.pool()?,
            ccd_dir: self.ccd_dir()?.to_path_buf(),
            assignment_template: template.clone(),
            counter_key: self.counter.key.clone(),
            unresolvable: self.consumer.unresolvable,
            dedupe_redelivery: self.consumer.dedupe_redelivery,
            applied_retention_days: self.consumer.applied_retention_days,
        })
    }

    pub fn subscription(&self) -> Result<Subscription, ConfigError> {
        if self.consumer.max_in_flight == 0 {
            return Err(invalid("consumer.max_in_flight", "must be at least 1"));
        }
        Ok(Subscription {
            topic: self.consumer.topic.clone(),
            tag: self.consumer.tag.clone().filter(|t| !t.is_empty()),
            max_in_flight: self.consumer.max_in_flight,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "uvpn", "uvpn").map_or_else(
        || PathBuf::from("/etc/uvpn/uvpn.toml"),
        |dirs| dirs.config_dir().join("uvpn.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if present), then environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load from `path`, or the platform config path when `None`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Ok(figment(&path).extract()?)
}

/// Render a config as TOML, e.g. to print the effective settings.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}
